//! Data model shared by every navrepo crate.
//!
//! - [`entity`]: entity type identity and metadata descriptors
//! - [`value`]: scalar field values
//! - [`record`]: dynamic entity instances with navigation slots
//! - [`predicate`]: filter predicates and ordering
//! - [`path`]: navigation load-paths
//! - [`metadata`]: the metadata provider contract and an in-memory registry
//! - [`error`]: configuration errors

pub mod entity;
pub mod error;
pub mod metadata;
pub mod path;
pub mod predicate;
pub mod record;
pub mod value;

// Re-export commonly used types
pub use entity::{EntityType, EntityTypeDescriptor, Join, KeyFieldDescriptor, KeyFields, NavigationDescriptor};
pub use error::ConfigurationError;
pub use metadata::{EntityMetadataProvider, MetadataRegistry, SchemaDocument};
pub use path::NavigationPath;
pub use predicate::{CompareOp, Direction, OrderBy, Predicate};
pub use record::{Record, Related};
pub use value::{Value, ValueKind};
