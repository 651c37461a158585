use sqlx::{Error as SqlxError, error::ErrorKind};
use thiserror::Error;

pub type SqliteResult<T> = std::result::Result<T, SqliteDaoError>;

#[derive(Debug, Error)]
pub enum SqliteDaoError {
    #[error("failed to parse SQLite connection URL `{url}`")]
    InvalidUrl {
        url: String,
        #[source]
        source: SqlxError,
    },
    #[error("failed to open SQLite pool")]
    Connect {
        #[source]
        source: SqlxError,
    },
    #[error("failed to apply schema statement `{statement}`")]
    Schema {
        statement: &'static str,
        #[source]
        source: SqlxError,
    },
    #[error("SQLite health check failed")]
    HealthPing {
        #[source]
        source: SqlxError,
    },
    #[error("failed to {operation}")]
    Query {
        operation: &'static str,
        #[source]
        source: SqlxError,
    },
}

impl SqliteDaoError {
    pub fn query(operation: &'static str) -> impl FnOnce(SqlxError) -> Self {
        move |source| SqliteDaoError::Query { operation, source }
    }

    /// True when a UNIQUE constraint rejected the statement.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            SqliteDaoError::Query { source, .. } => source
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation()),
            _ => false,
        }
    }

    /// True when a foreign key, NOT NULL or CHECK constraint rejected the statement.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            SqliteDaoError::Query { source, .. } => source.as_database_error().is_some_and(|db| {
                matches!(
                    db.kind(),
                    ErrorKind::ForeignKeyViolation
                        | ErrorKind::NotNullViolation
                        | ErrorKind::CheckViolation
                )
            }),
            _ => false,
        }
    }
}
