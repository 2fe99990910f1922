//! Query description and result types shared by every backend.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use navrepo_core::{EntityType, NavigationPath, OrderBy, Predicate};

/// Whether the store keeps change-tracking bookkeeping for returned entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    /// Faster, but some stores reject cyclic include shapes.
    Untracked,
    Tracked,
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingMode::Untracked => f.write_str("untracked"),
            TrackingMode::Tracked => f.write_str("tracked"),
        }
    }
}

/// A read query against one entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub entity_type: EntityType,
    /// Eager-load directives.
    pub includes: Vec<NavigationPath>,
    pub tracking: TrackingMode,
    pub filter: Predicate,
    /// Applied in order; later entries break ties of earlier ones.
    pub order: Vec<OrderBy>,
    pub skip: usize,
    pub take: Option<usize>,
    /// Skip the store's global query filters (e.g. soft delete).
    pub ignore_query_filters: bool,
    pub timeout: Option<Duration>,
}

impl QuerySpec {
    /// An untracked query returning every row of `entity_type`.
    pub fn new(entity_type: EntityType) -> Self {
        QuerySpec {
            entity_type,
            includes: Vec::new(),
            tracking: TrackingMode::Untracked,
            filter: Predicate::True,
            order: Vec::new(),
            skip: 0,
            take: None,
            ignore_query_filters: false,
            timeout: None,
        }
    }

    pub fn include<I>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = NavigationPath>,
    {
        self.includes.extend(paths);
        self
    }

    pub fn tracking(mut self, mode: TrackingMode) -> Self {
        self.tracking = mode;
        self
    }

    /// ANDs `predicate` into the filter.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = std::mem::replace(&mut self.filter, Predicate::True).and(predicate);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    pub fn skip(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    pub fn take(mut self, n: usize) -> Self {
        self.take = Some(n);
        self
    }

    pub fn ignore_query_filters(mut self) -> Self {
        self.ignore_query_filters = true;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: usize,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Page {
            total: 0,
            items: Vec::new(),
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            total: self.total,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_accumulates_conjunction() {
        let q = QuerySpec::new(EntityType::new("Order"))
            .filter(Predicate::eq("a", 1))
            .filter(Predicate::eq("b", 2));
        assert_eq!(q.filter, Predicate::eq("a", 1).and(Predicate::eq("b", 2)));
    }

    #[test]
    fn defaults_are_untracked_and_unbounded() {
        let q = QuerySpec::new(EntityType::new("Order"));
        assert_eq!(q.tracking, TrackingMode::Untracked);
        assert_eq!(q.take, None);
        assert!(!q.ignore_query_filters);
    }

    #[test]
    fn page_map_keeps_total() {
        let page = Page {
            total: 10,
            items: vec![1, 2],
        };
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.total, 10);
        assert_eq!(mapped.items, vec![10, 20]);
    }
}
