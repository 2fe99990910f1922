//! Include-path resolution shared by backends.
//!
//! [`IncludeTree`] merges flat load-paths (`Lines`, `Lines.Product`) into a
//! prefix tree so each navigation is materialized once per parent.
//! [`check_includes`] validates every path against the metadata and enforces
//! the untracked-query shape rule: a path that re-enters an entity type it
//! already passed through cannot be loaded without identity resolution.

use indexmap::IndexMap;

use navrepo_core::{EntityMetadataProvider, EntityType, NavigationPath};

use crate::error::StorageError;
use crate::types::TrackingMode;

/// Prefix tree of navigation names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeTree {
    children: IndexMap<String, IncludeTree>,
}

impl IncludeTree {
    pub fn from_paths<'a, I>(paths: I) -> Self
    where
        I: IntoIterator<Item = &'a NavigationPath>,
    {
        let mut tree = IncludeTree::default();
        for path in paths {
            let mut node = &mut tree;
            for segment in path.segments() {
                node = node.children.entry(segment.to_string()).or_default();
            }
        }
        tree
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &IncludeTree)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Validates include paths for a query rooted at `root`.
///
/// Navigations without a join are accepted; stores leave them unloaded.
pub fn check_includes(
    metadata: &dyn EntityMetadataProvider,
    root: &EntityType,
    includes: &[NavigationPath],
    tracking: TrackingMode,
) -> Result<(), StorageError> {
    for path in includes {
        let mut seen: Vec<&EntityType> = vec![root];
        let mut current = root;
        for segment in path.segments() {
            let nav = metadata
                .find_navigations(current)
                .iter()
                .find(|n| n.name == segment)
                .ok_or_else(|| StorageError::InvalidInclude {
                    entity_type: root.clone(),
                    path: path.to_string(),
                    reason: format!("'{}' has no navigation '{}'", current, segment),
                })?;
            if tracking == TrackingMode::Untracked && seen.contains(&&nav.target) {
                return Err(StorageError::TrackingConflict {
                    entity_type: root.clone(),
                    path: path.to_string(),
                });
            }
            seen.push(&nav.target);
            current = &nav.target;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use navrepo_core::{EntityTypeDescriptor, MetadataRegistry, NavigationDescriptor, ValueKind};

    fn registry() -> MetadataRegistry {
        MetadataRegistry::new()
            .with(
                EntityTypeDescriptor::new("Order")
                    .key("id", ValueKind::Int)
                    .navigation(
                        NavigationDescriptor::single("Customer", "Customer")
                            .with_join("customer_id", "id"),
                    )
                    .navigation(
                        NavigationDescriptor::collection("Lines", "OrderLine")
                            .with_join("id", "order_id"),
                    )
                    .navigation(NavigationDescriptor::single("Notes", "Customer")),
            )
            .with(EntityTypeDescriptor::new("Customer").key("id", ValueKind::Int))
            .with(
                EntityTypeDescriptor::new("OrderLine").key("id", ValueKind::Int).navigation(
                    NavigationDescriptor::single("Order", "Order").with_join("order_id", "id"),
                ),
            )
    }

    #[test]
    fn tree_merges_common_prefixes() {
        let paths: Vec<NavigationPath> =
            vec!["Lines".into(), "Lines.Order".into(), "Customer".into()];
        let tree = IncludeTree::from_paths(&paths);
        let top: Vec<_> = tree.children().map(|(name, _)| name).collect();
        assert_eq!(top, vec!["Lines", "Customer"]);
        let (_, lines) = tree.children().next().unwrap();
        assert_eq!(lines.children().count(), 1);
    }

    #[test]
    fn cyclic_path_conflicts_only_when_untracked() {
        let registry = registry();
        let order = EntityType::new("Order");
        let paths = vec![NavigationPath::from("Lines.Order")];
        let err = check_includes(&registry, &order, &paths, TrackingMode::Untracked).unwrap_err();
        assert!(matches!(err, StorageError::TrackingConflict { .. }));
        assert!(check_includes(&registry, &order, &paths, TrackingMode::Tracked).is_ok());
    }

    #[test]
    fn acyclic_paths_pass_untracked() {
        let registry = registry();
        let paths = vec![NavigationPath::from("Lines"), NavigationPath::from("Customer")];
        assert!(check_includes(
            &registry,
            &EntityType::new("Order"),
            &paths,
            TrackingMode::Untracked
        )
        .is_ok());
    }

    #[test]
    fn unknown_navigation_is_invalid() {
        let registry = registry();
        let err = check_includes(
            &registry,
            &EntityType::new("Order"),
            &[NavigationPath::from("Shipments")],
            TrackingMode::Tracked,
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::InvalidInclude { .. }));
    }

    #[test]
    fn navigation_without_join_is_accepted() {
        let registry = registry();
        let order = EntityType::new("Order");
        let paths = [NavigationPath::from("Notes")];
        for mode in [TrackingMode::Untracked, TrackingMode::Tracked] {
            assert!(check_includes(&registry, &order, &paths, mode).is_ok(), "{mode}");
        }
    }
}
