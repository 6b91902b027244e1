//! In-process key-value store with Redis-like semantics.
//!
//! Holds string, set, and list values in one map behind a lock. Reading a
//! key as the wrong kind fails the way Redis reports `WRONGTYPE`, and empty
//! sets and lists disappear just as they do on a server.
//!
//! Connectivity loss can be simulated with [`MemoryStore::set_offline`] or
//! [`MemoryStore::fail_after`], which makes partial multi-key operations
//! reproducible in tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::StoreError;

/// One stored value.
#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Set(BTreeSet<String>),
    List(Vec<String>),
}

#[derive(Debug, Default)]
struct State {
    data: HashMap<String, Value>,
    offline: bool,
    /// Commands still allowed before going offline.
    remaining: Option<u64>,
}

impl State {
    /// Account for one command, failing if the store is unreachable.
    fn admit(&mut self) -> Result<(), StoreError> {
        if let Some(remaining) = self.remaining {
            match remaining.checked_sub(1) {
                Some(left) => self.remaining = Some(left),
                None => self.offline = true,
            }
        }
        if self.offline {
            return Err(StoreError::unavailable("memory store is offline"));
        }
        Ok(())
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::unavailable(format!(
        "WRONGTYPE operation against a key holding the wrong kind of value: {key}"
    ))
}

/// Shared in-memory store. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent command fail (or succeed again).
    pub fn set_offline(&self, offline: bool) {
        let mut state = self.state.lock();
        state.offline = offline;
        state.remaining = None;
    }

    /// Allow `commands` more commands, then fail all that follow.
    pub fn fail_after(&self, commands: u64) {
        let mut state = self.state.lock();
        state.offline = false;
        state.remaining = Some(commands);
    }

    /// Number of keys currently stored.
    pub fn key_count(&self) -> usize {
        self.state.lock().data.len()
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state.lock().data.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    // =========================================================================
    // Plain values
    // =========================================================================

    /// Read the string value at `key`.
    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut state = self.state.lock();
        state.admit()?;
        match state.data.get(key) {
            None => Ok(None),
            Some(Value::Text(text)) => Ok(Some(text.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    /// Write `value` at `key`, replacing any previous value of any kind.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.admit()?;
        state
            .data
            .insert(key.to_owned(), Value::Text(value.to_owned()));
        Ok(())
    }

    /// Delete `key`. Returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        state.admit()?;
        Ok(state.data.remove(key).is_some())
    }

    /// Whether `key` exists.
    pub fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        state.admit()?;
        Ok(state.data.contains_key(key))
    }

    // =========================================================================
    // Sets
    // =========================================================================

    /// Add `member` to the set at `key`. Returns whether it was new.
    pub fn sadd(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        state.admit()?;
        let entry = state
            .data
            .entry(key.to_owned())
            .or_insert_with(|| Value::Set(BTreeSet::new()));
        match entry {
            Value::Set(set) => Ok(set.insert(member.to_owned())),
            _ => Err(wrong_type(key)),
        }
    }

    /// Remove `member` from the set at `key`. Returns whether it was present.
    pub fn srem(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        state.admit()?;
        let (removed, now_empty) = match state.data.get_mut(key) {
            None => return Ok(false),
            Some(Value::Set(set)) => (set.remove(member), set.is_empty()),
            Some(_) => return Err(wrong_type(key)),
        };
        if now_empty {
            state.data.remove(key);
        }
        Ok(removed)
    }

    /// All members of the set at `key`.
    pub fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut state = self.state.lock();
        state.admit()?;
        match state.data.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    // =========================================================================
    // Lists
    // =========================================================================

    /// Append `values` to the list at `key`.
    pub fn rpush(&self, key: &str, values: &[String]) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.admit()?;
        if values.is_empty() {
            return Ok(());
        }
        let entry = state
            .data
            .entry(key.to_owned())
            .or_insert_with(|| Value::List(Vec::new()));
        match entry {
            Value::List(list) => {
                list.extend_from_slice(values);
                Ok(())
            }
            _ => Err(wrong_type(key)),
        }
    }

    /// The whole list at `key`, oldest first.
    pub fn lrange(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut state = self.state.lock();
        state.admit()?;
        match state.data.get(key) {
            None => Ok(Vec::new()),
            Some(Value::List(list)) => Ok(list.clone()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    /// Replace the list at `key` with `values`.
    ///
    /// Counts as two commands, like the delete-then-push a server needs.
    pub fn replace_list(&self, key: &str, values: &[String]) -> Result<(), StoreError> {
        self.delete(key)?;
        self.rpush(key, values)
    }
}
