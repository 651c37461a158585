use std::str::FromStr;

use sqlx::sqlite::SqliteConnectOptions;

use super::error::{SqliteDaoError, SqliteResult};

const DEFAULT_MAX_CONNECTIONS: u32 = 8;

#[derive(Clone, Debug)]
pub struct SqliteConfig {
    pub options: SqliteConnectOptions,
    pub max_connections: u32,
    /// In-memory databases live as long as their connection, so the pool is pinned to one.
    pub in_memory: bool,
}

impl SqliteConfig {
    pub fn from_url(url: &str) -> SqliteResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|source| SqliteDaoError::InvalidUrl {
                url: url.to_owned(),
                source,
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let max_connections = if in_memory { 1 } else { DEFAULT_MAX_CONNECTIONS };

        Ok(Self {
            options,
            max_connections,
            in_memory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_url_pins_the_pool_to_one_connection() {
        let config = SqliteConfig::from_url("sqlite::memory:").expect("valid url");
        assert!(config.in_memory);
        assert_eq!(config.max_connections, 1);
    }

    #[test]
    fn file_url_uses_a_regular_pool() {
        let config = SqliteConfig::from_url("sqlite://arcade.db?mode=rwc").expect("valid url");
        assert!(!config.in_memory);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }
}
