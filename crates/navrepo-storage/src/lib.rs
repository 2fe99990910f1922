//! Storage abstraction for navrepo.
//!
//! Provides the [`StoreQuery`] trait defining the contract every backend
//! implements, plus [`InMemoryStore`] as the reference backend.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`types`]: QuerySpec, TrackingMode and Page
//! - [`traits`]: StoreQuery trait definition
//! - [`include`]: include-path trees and shape checks
//! - [`memory`]: InMemoryStore implementation

pub mod error;
pub mod include;
pub mod memory;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use include::{check_includes, IncludeTree};
pub use memory::InMemoryStore;
pub use traits::StoreQuery;
pub use types::{Page, QuerySpec, TrackingMode};
