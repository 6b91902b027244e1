//! Connection configuration for the Redis backend.
//!
//! The store needs a URL and, optionally, a logical database index. Both
//! are fixed when the client is built; nothing here changes at runtime.

use crate::error::StoreError;

/// Default Redis URL when `REDIS_URL` is not set.
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Configuration for connecting to Redis (or a compatible server).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Redis connection URL.
    ///
    /// Format: `redis://host:port` or `redis://host:port/db`
    pub url: String,
    /// Logical database to select, overriding any index in the URL.
    pub database: Option<u8>,
}

impl StoreConfig {
    /// Create a configuration from a URL, keeping the URL's database.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            database: None,
        }
    }

    /// Select a logical database.
    #[must_use]
    pub const fn with_database(mut self, database: u8) -> Self {
        self.database = Some(database);
        self
    }

    /// Load configuration from environment variables.
    ///
    /// - `REDIS_URL` -- connection URL (default `redis://localhost:6379`)
    /// - `REDIS_DB` -- logical database index (optional)
    pub fn from_env() -> Result<Self, StoreError> {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_owned());
        let database = std::env::var("REDIS_DB").ok();
        Self::from_parts(&url, database.as_deref())
    }

    /// Build from raw values as they would appear in the environment.
    fn from_parts(url: &str, database: Option<&str>) -> Result<Self, StoreError> {
        let config = Self::new(url);
        match database {
            None => Ok(config),
            Some(raw) => {
                let db: u8 = raw
                    .trim()
                    .parse()
                    .map_err(|e| StoreError::Config(format!("invalid REDIS_DB `{raw}`: {e}")))?;
                Ok(config.with_database(db))
            }
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REDIS_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_redis() {
        let config = StoreConfig::default();
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.database, None);
    }

    #[test]
    fn database_override_parses() {
        let config = StoreConfig::from_parts("redis://cache:6380", Some(" 3 "));
        assert!(matches!(
            config,
            Ok(StoreConfig { ref url, database: Some(3) }) if url == "redis://cache:6380"
        ));
    }

    #[test]
    fn invalid_database_is_config_error() {
        let result = StoreConfig::from_parts("redis://cache:6380", Some("nine"));
        assert!(matches!(result, Err(StoreError::Config(_))));
    }
}
