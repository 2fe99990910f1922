//! Configuration errors for navrepo-core.
//!
//! Uses `thiserror` for structured, matchable variants. Every variant is a
//! mapping mistake (metadata that does not fit the call), never a transient
//! store problem, so callers surface them immediately.

use thiserror::Error;

use crate::entity::EntityType;
use crate::value::ValueKind;

/// Missing or mismatched entity metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The metadata provider does not know the entity type.
    #[error("unknown entity type: '{entity_type}'")]
    UnknownEntityType { entity_type: EntityType },

    /// The entity type declares no primary key.
    #[error("entity type '{entity_type}' has no primary key")]
    NoPrimaryKey { entity_type: EntityType },

    /// A single-key builder was requested for a composite key.
    #[error("entity type '{entity_type}' has a composite key of {arity} fields; a single key value was supplied")]
    CompositeKey { entity_type: EntityType, arity: usize },

    /// A composite-key builder was requested for a single-field key.
    #[error("entity type '{entity_type}' has a single-field key; a composite key was supplied")]
    SingleKey { entity_type: EntityType },

    /// The number of key values does not match the key arity.
    #[error("entity type '{entity_type}' expects {expected} key value(s), got {actual}")]
    KeyArityMismatch {
        entity_type: EntityType,
        expected: usize,
        actual: usize,
    },

    /// A key value has the wrong kind for its field.
    #[error("key field '{entity_type}.{field}' expects {expected}, got {actual}")]
    KeyKindMismatch {
        entity_type: EntityType,
        field: String,
        expected: ValueKind,
        actual: String,
    },

    /// A record was handed to a repository bound to another entity type.
    #[error("expected a '{expected}' record, got '{actual}'")]
    EntityTypeMismatch {
        expected: EntityType,
        actual: EntityType,
    },

    /// A metadata schema could not be read.
    #[error("invalid metadata schema: {reason}")]
    InvalidSchema { reason: String },
}
