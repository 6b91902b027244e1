//! Key-value storage backend for a wiki content model.
//!
//! Persists bags, recipes, tiddlers (with full revision history), users,
//! and their policies into Redis, or any store offering the same string,
//! set, and list primitives. The mapping layer here owns the key scheme,
//! the value encoding, the revision chains, and the membership indexes;
//! the store itself enforces none of these.
//!
//! # Architecture
//!
//! ```text
//! Hosting application
//!     |
//!     +-- TiddlerStore (store)          get/put/delete/list per entity
//!         |-- RevisionStore (revisions) pointer + immutable records
//!         |-- ContainerIndex (index)    bag sets, recipe lists, master lists
//!         |-- codec                     versioned JSON envelopes
//!         |-- keys                      escaped, namespaced key names
//!         +-- KvBackend (backend)
//!             |-- RedisPool (redis)     fred client
//!             +-- MemoryStore (memory)  in-process, for tests
//! ```
//!
//! # Modules
//!
//! - [`store`] -- The public storage contract
//! - [`keys`] -- Key naming and escaping
//! - [`codec`] -- Entity encoding and decoding
//! - [`hooks`] -- Post-write notification for external indexes
//! - [`backend`] -- Dispatch over key-value clients
//! - [`redis`] -- Redis client wrapper
//! - [`memory`] -- In-process store
//! - [`config`] -- Connection configuration
//! - [`error`] -- Shared error type

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod hooks;
mod index;
pub mod keys;
pub mod memory;
pub mod redis;
mod revisions;
pub mod store;

// Re-export primary types for convenience.
pub use backend::KvBackend;
pub use config::StoreConfig;
pub use error::StoreError;
pub use hooks::{IndexHook, StoreEvent};
pub use memory::MemoryStore;
pub use redis::RedisPool;
pub use store::{PolicyHolder, TiddlerStore};
