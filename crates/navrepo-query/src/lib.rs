//! Eager-loading repository layer for navrepo.
//!
//! Sits between callers and a [`StoreQuery`](navrepo_storage::StoreQuery)
//! backend and turns entity metadata into full-depth loads.
//!
//! # Modules
//!
//! - [`discovery`]: cycle-safe walk of navigation metadata into load-paths
//! - [`path_cache`]: memoized discovery per entity type and marker set
//! - [`key_predicate`]: cached primary-key predicate builders
//! - [`clearer`]: resets navigation slots before root-only writes
//! - [`guard`]: circular-reference flags and the tracked-retry protocol
//! - [`context`]: the shared caches bundled per process
//! - [`repository`]: generic reads and writes over one entity type
//! - [`config`]: RepositoryConfig and environment overrides
//! - [`error`]: QueryError

pub mod clearer;
pub mod config;
pub mod context;
pub mod discovery;
pub mod error;
pub mod guard;
pub mod key_predicate;
pub mod path_cache;
pub mod repository;

pub use clearer::RelationshipClearer;
pub use config::{ConfigError, FlagPolicy, RepositoryConfig};
pub use context::QueryContext;
pub use discovery::{NavigationPathDiscoverer, DEFAULT_IGNORE_MARKERS, DEFAULT_MAX_DEPTH};
pub use error::QueryError;
pub use guard::{cancellable, is_tracking_conflict, CircularReferenceGuard, Outcome};
pub use key_predicate::{CompositeKeyBuilder, KeyPredicateCompiler, KeyValues, SingleKeyBuilder};
pub use path_cache::{PathCache, PathSet};
pub use repository::{LoadDepth, Repository};
