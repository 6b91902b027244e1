//! Key-value backend dispatch.
//!
//! The mapping layer talks to the store only through [`KvBackend`]. It uses
//! enum dispatch instead of a trait object because async methods are not
//! dyn-compatible. Each call is one atomic store command, except
//! [`KvBackend::replace_list`].

use crate::error::StoreError;
use crate::memory::MemoryStore;
use crate::redis::RedisPool;

/// A connected key-value store.
#[derive(Clone)]
pub enum KvBackend {
    /// A Redis-compatible server.
    Redis(RedisPool),
    /// The in-process store.
    Memory(MemoryStore),
}

impl KvBackend {
    /// Read the string value at `key`.
    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            Self::Redis(pool) => pool.get(key).await,
            Self::Memory(store) => store.get(key),
        }
    }

    /// Write `value` at `key`.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        match self {
            Self::Redis(pool) => pool.set(key, value).await,
            Self::Memory(store) => store.set(key, value),
        }
    }

    /// Delete `key`. Returns whether it existed.
    pub async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        match self {
            Self::Redis(pool) => pool.delete(key).await,
            Self::Memory(store) => store.delete(key),
        }
    }

    /// Whether `key` exists.
    pub async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match self {
            Self::Redis(pool) => pool.exists(key).await,
            Self::Memory(store) => store.exists(key),
        }
    }

    /// Add `member` to the set at `key`.
    pub async fn sadd(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        match self {
            Self::Redis(pool) => pool.sadd(key, member).await,
            Self::Memory(store) => store.sadd(key, member),
        }
    }

    /// Remove `member` from the set at `key`.
    pub async fn srem(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        match self {
            Self::Redis(pool) => pool.srem(key, member).await,
            Self::Memory(store) => store.srem(key, member),
        }
    }

    /// All members of the set at `key`.
    pub async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self {
            Self::Redis(pool) => pool.smembers(key).await,
            Self::Memory(store) => store.smembers(key),
        }
    }

    /// Append `values` to the list at `key`.
    pub async fn rpush(&self, key: &str, values: &[String]) -> Result<(), StoreError> {
        match self {
            Self::Redis(pool) => pool.rpush(key, values).await,
            Self::Memory(store) => store.rpush(key, values),
        }
    }

    /// The whole list at `key`.
    pub async fn lrange(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self {
            Self::Redis(pool) => pool.lrange(key).await,
            Self::Memory(store) => store.lrange(key),
        }
    }

    /// Replace the list at `key` with `values` (delete, then push).
    pub async fn replace_list(&self, key: &str, values: &[String]) -> Result<(), StoreError> {
        match self {
            Self::Redis(pool) => pool.replace_list(key, values).await,
            Self::Memory(store) => store.replace_list(key, values),
        }
    }
}

impl From<RedisPool> for KvBackend {
    fn from(pool: RedisPool) -> Self {
        Self::Redis(pool)
    }
}

impl From<MemoryStore> for KvBackend {
    fn from(store: MemoryStore) -> Self {
        Self::Memory(store)
    }
}
