mod config;
mod error;
mod models;
mod schema;
pub mod store;

pub use config::SqliteConfig;
pub use error::SqliteDaoError;
pub use store::SqliteStore;

use crate::dao::storage::StorageError;

impl From<SqliteDaoError> for StorageError {
    fn from(err: SqliteDaoError) -> Self {
        if err.is_unique_violation() {
            StorageError::conflict(err.to_string())
        } else if err.is_constraint_violation() {
            StorageError::rejected(err.to_string())
        } else {
            StorageError::unavailable(err.to_string(), err)
        }
    }
}
