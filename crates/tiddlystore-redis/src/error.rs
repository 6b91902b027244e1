//! Error types for the storage layer.
//!
//! Every operation reports failures through [`StoreError`]. Nothing is
//! retried or masked here: a missing entity, a corrupt value, and a lost
//! connection each surface as their own variant for the caller to
//! translate.

use tiddlystore_types::EntityKind;

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The entity or revision does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of the missing entity.
        kind: EntityKind,
        /// Human-readable identity of the missing entity.
        id: String,
    },

    /// An identifier cannot be encoded into a key.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A stored value is structurally invalid.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A stored value carries a field this codec cannot represent.
    #[error("unsupported field `{field}` in stored {entity}")]
    UnsupportedFieldType {
        /// Kind of the value being decoded.
        entity: EntityKind,
        /// Name of the offending field.
        field: String,
    },

    /// The key-value store could not be reached or rejected a command.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] fred::error::Error),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Shorthand for a [`StoreError::NotFound`].
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// A [`StoreError::Decode`] for a value that parsed as JSON but breaks
    /// the stored layout.
    pub fn decode(msg: impl std::fmt::Display) -> Self {
        Self::Decode(serde::de::Error::custom(msg))
    }

    /// A [`StoreError::StoreUnavailable`] raised outside the Redis client.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(fred::error::Error::new(fred::error::ErrorKind::IO, msg.into()))
    }

    /// Whether this is a [`StoreError::NotFound`].
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
