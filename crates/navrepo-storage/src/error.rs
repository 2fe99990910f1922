//! Storage error types for navrepo-storage.
//!
//! [`StorageError`] covers the failure modes a [`StoreQuery`](crate::StoreQuery)
//! backend reports. [`StorageError::TrackingConflict`] is the stable signature
//! for "untracked query + cyclic include path"; the query layer recognizes it
//! and retries in tracked mode.

use std::time::Duration;

use navrepo_core::EntityType;
use thiserror::Error;

/// Errors produced by store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// An untracked query asked for an include path that re-enters a type
    /// already on the path.
    #[error("untracked query on '{entity_type}' cannot load cyclic include path '{path}'; use a tracked query")]
    TrackingConflict { entity_type: EntityType, path: String },

    /// The caller-supplied timeout elapsed before the query finished.
    #[error("query on '{entity_type}' timed out after {after:?}")]
    Timeout {
        entity_type: EntityType,
        after: Duration,
    },

    /// The store has no table or metadata for the entity type.
    #[error("unknown entity type: '{0}'")]
    UnknownEntityType(EntityType),

    /// An include path names a navigation the store cannot resolve.
    #[error("invalid include '{path}' on '{entity_type}': {reason}")]
    InvalidInclude {
        entity_type: EntityType,
        path: String,
        reason: String,
    },

    /// An insert collided with an existing primary key.
    #[error("duplicate key for '{entity_type}': {key}")]
    DuplicateKey { entity_type: EntityType, key: String },

    /// The backend could not be reached or refused the operation.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
}
