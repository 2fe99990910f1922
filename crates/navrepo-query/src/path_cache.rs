//! Memoized load-path discovery.
//!
//! Entries are keyed by entity type and the normalized ignore-marker set and
//! never evicted. Discovery runs outside any lock; when two callers race on
//! the same key both compute, the first insert wins, and every caller gets
//! the retained set.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexSet;

use navrepo_core::{EntityMetadataProvider, EntityType, NavigationPath};

use crate::discovery::NavigationPathDiscoverer;

pub type PathSet = Arc<IndexSet<NavigationPath>>;

pub struct PathCache {
    metadata: Arc<dyn EntityMetadataProvider>,
    max_depth: usize,
    default_markers: Vec<String>,
    entries: DashMap<(EntityType, String), PathSet>,
    discoveries: AtomicUsize,
}

impl PathCache {
    pub fn new(
        metadata: Arc<dyn EntityMetadataProvider>,
        max_depth: usize,
        default_markers: Vec<String>,
    ) -> Self {
        PathCache {
            metadata,
            max_depth,
            default_markers,
            entries: DashMap::new(),
            discoveries: AtomicUsize::new(0),
        }
    }

    /// Load-paths for `root` with the configured ignore markers.
    pub fn get_or_compute_default(&self, root: &EntityType) -> PathSet {
        self.get_or_compute(root, self.default_markers.as_slice())
    }

    /// Load-paths for `root`, skipping navigations carrying any of `ignored`.
    pub fn get_or_compute<S: AsRef<str>>(&self, root: &EntityType, ignored: &[S]) -> PathSet {
        let key = (root.clone(), signature(ignored));
        if let Some(hit) = self.entries.get(&key) {
            return Arc::clone(hit.value());
        }

        let discovered = NavigationPathDiscoverer::new(self.metadata.as_ref()).discover(
            root,
            self.max_depth,
            ignored,
        );
        self.discoveries.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            entity_type = %root,
            markers = %key.1,
            paths = discovered.len(),
            "discovered load paths"
        );

        let entry = self.entries.entry(key).or_insert_with(|| Arc::new(discovered));
        Arc::clone(entry.value())
    }

    pub fn contains<S: AsRef<str>>(&self, root: &EntityType, ignored: &[S]) -> bool {
        self.entries.contains_key(&(root.clone(), signature(ignored)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of discovery walks run so far, including lost races.
    pub fn discoveries(&self) -> usize {
        self.discoveries.load(Ordering::Relaxed)
    }
}

/// Order-insensitive cache key for a marker set.
fn signature<S: AsRef<str>>(markers: &[S]) -> String {
    let mut names: Vec<&str> = markers.iter().map(AsRef::as_ref).collect();
    names.sort_unstable();
    names.dedup();
    names.join(",")
}
