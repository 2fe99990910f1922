//! Process-wide query state shared by every repository.

use std::sync::Arc;

use navrepo_core::EntityMetadataProvider;

use crate::clearer::RelationshipClearer;
use crate::config::RepositoryConfig;
use crate::guard::CircularReferenceGuard;
use crate::key_predicate::KeyPredicateCompiler;
use crate::path_cache::PathCache;

/// Caches and flags shared across repositories.
///
/// Build one per process and hand clones of the `Arc` to each
/// [`Repository`](crate::Repository). Everything inside is safe to use from
/// many tasks at once.
pub struct QueryContext {
    config: RepositoryConfig,
    metadata: Arc<dyn EntityMetadataProvider>,
    paths: PathCache,
    keys: KeyPredicateCompiler,
    clearer: RelationshipClearer,
    guard: CircularReferenceGuard,
}

impl QueryContext {
    pub fn new(metadata: Arc<dyn EntityMetadataProvider>, config: RepositoryConfig) -> Self {
        QueryContext {
            paths: PathCache::new(
                Arc::clone(&metadata),
                config.max_depth,
                config.ignore_markers.clone(),
            ),
            keys: KeyPredicateCompiler::new(Arc::clone(&metadata)),
            clearer: RelationshipClearer::new(Arc::clone(&metadata)),
            guard: CircularReferenceGuard::new(config.flag_policy),
            metadata,
            config,
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn metadata(&self) -> &dyn EntityMetadataProvider {
        self.metadata.as_ref()
    }

    pub fn paths(&self) -> &PathCache {
        &self.paths
    }

    pub fn keys(&self) -> &KeyPredicateCompiler {
        &self.keys
    }

    pub fn clearer(&self) -> &RelationshipClearer {
        &self.clearer
    }

    pub fn guard(&self) -> &CircularReferenceGuard {
        &self.guard
    }
}
