//! Redis (or `Dragonfly`) client for the storage primitives.
//!
//! Thin typed wrapper over a [`fred`] client. Every method is one store
//! command except [`RedisPool::replace_list`], which is a delete followed
//! by a push and is not atomic as a whole.

use fred::prelude::*;

use crate::config::StoreConfig;
use crate::error::StoreError;

/// Connection handle to a Redis-compatible server.
///
/// Cloning is cheap and shares the underlying connection.
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
}

impl RedisPool {
    /// Connect using the given configuration.
    ///
    /// The logical database is selected here and stays fixed for the
    /// lifetime of the handle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed.
    /// Returns [`StoreError::StoreUnavailable`] if the connection fails.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut redis_config = Config::from_url(&config.url)
            .map_err(|e| StoreError::Config(format!("Invalid Redis URL: {e}")))?;
        if let Some(database) = config.database {
            redis_config.database = Some(database);
        }

        let client = Builder::from_config(redis_config).build()?;
        client.init().await?;

        tracing::info!(database = config.database, "Connected to Redis");
        Ok(Self { client })
    }

    /// Connect to a URL with no database override.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the URL is invalid or the connection fails.
    pub async fn connect_url(url: &str) -> Result<Self, StoreError> {
        Self::connect(&StoreConfig::new(url)).await
    }

    // =========================================================================
    // Plain values
    // =========================================================================

    /// Read the string value at `key`.
    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value: Option<String> = self.client.get(key).await?;
        Ok(value)
    }

    /// Write `value` at `key`, replacing any previous value.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _: () = self.client.set(key, value, None, None, false).await?;
        Ok(())
    }

    /// Delete `key`. Returns whether it existed.
    pub async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let removed: u32 = self.client.del(key).await?;
        Ok(removed > 0)
    }

    /// Whether `key` exists.
    pub async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let count: u32 = self.client.exists(key).await?;
        Ok(count > 0)
    }

    // =========================================================================
    // Sets
    // =========================================================================

    /// Add `member` to the set at `key`. Returns whether it was new.
    pub async fn sadd(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let added: u32 = self.client.sadd(key, member).await?;
        Ok(added > 0)
    }

    /// Remove `member` from the set at `key`. Returns whether it was present.
    pub async fn srem(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let removed: u32 = self.client.srem(key, member).await?;
        Ok(removed > 0)
    }

    /// All members of the set at `key`, in no particular order.
    pub async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let members: Vec<String> = self.client.smembers(key).await?;
        Ok(members)
    }

    // =========================================================================
    // Lists
    // =========================================================================

    /// Append `values` to the list at `key` (RPUSH).
    pub async fn rpush(&self, key: &str, values: &[String]) -> Result<(), StoreError> {
        if values.is_empty() {
            return Ok(());
        }
        let _: u64 = self.client.rpush(key, values.to_vec()).await?;
        Ok(())
    }

    /// The whole list at `key`, oldest first.
    pub async fn lrange(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let values: Vec<String> = self.client.lrange(key, 0, -1).await?;
        Ok(values)
    }

    /// Replace the list at `key` with `values`.
    pub async fn replace_list(&self, key: &str, values: &[String]) -> Result<(), StoreError> {
        let _: u32 = self.client.del(key).await?;
        self.rpush(key, values).await
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Flush all keys from the server.
    ///
    /// **WARNING:** This deletes all data. Only use for testing.
    pub async fn flush_all(&self) -> Result<(), StoreError> {
        let _: () = self.client.flushall(false).await?;
        Ok(())
    }

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StoreUnavailable`] if the server rejects `QUIT`.
    pub async fn quit(&self) -> Result<(), StoreError> {
        self.client.quit().await?;
        tracing::info!("Redis connection closed");
        Ok(())
    }
}
