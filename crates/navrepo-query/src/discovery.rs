//! Cycle-safe discovery of eager-load paths.
//!
//! [`NavigationPathDiscoverer`] walks an entity type's navigations depth
//! first and returns every load-path as a flat set. The walk keeps
//! branch-local state (tokens and entity types on the current branch), pushed
//! before descending and popped on return, so the same navigation may appear
//! on separate branches while a branch can never loop.
//!
//! Per navigation:
//! 1. a `(name, target)` token already on the branch prunes it, unrecorded;
//! 2. otherwise the path is recorded;
//! 3. the walk descends only below `max_depth` and only into a target type
//!    not already on the branch, so back-references are loaded, not expanded.

use indexmap::IndexSet;

use navrepo_core::{EntityMetadataProvider, EntityType, NavigationPath};

/// Depth limit used when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Markers that exclude a navigation from discovery by default.
pub const DEFAULT_IGNORE_MARKERS: &[&str] = &["json_ignore", "serde_skip"];

/// Walks navigation metadata and produces load-paths.
pub struct NavigationPathDiscoverer<'a> {
    metadata: &'a dyn EntityMetadataProvider,
}

impl<'a> NavigationPathDiscoverer<'a> {
    pub fn new(metadata: &'a dyn EntityMetadataProvider) -> Self {
        NavigationPathDiscoverer { metadata }
    }

    /// Discovers every load-path reachable from `root`.
    ///
    /// Navigations carrying any marker in `ignored` are skipped together with
    /// everything below them. Unknown root types yield an empty set.
    pub fn discover<S: AsRef<str>>(
        &self,
        root: &EntityType,
        max_depth: usize,
        ignored: &[S],
    ) -> IndexSet<NavigationPath> {
        let mut walk = Walk {
            metadata: self.metadata,
            ignored,
            max_depth,
            tokens: Vec::new(),
            types: vec![root],
            paths: IndexSet::new(),
        };
        if max_depth > 0 {
            walk.visit(root, None, 0);
        }
        walk.paths
    }
}

struct Walk<'w, 'i, S> {
    metadata: &'w dyn EntityMetadataProvider,
    ignored: &'i [S],
    max_depth: usize,
    /// `(name, target)` tokens on the current branch.
    tokens: Vec<(&'w str, &'w EntityType)>,
    /// Entity types on the current branch, root first.
    types: Vec<&'w EntityType>,
    paths: IndexSet<NavigationPath>,
}

impl<'w, 'i, S: AsRef<str>> Walk<'w, 'i, S> {
    fn visit(&mut self, current: &'w EntityType, prefix: Option<&NavigationPath>, depth: usize) {
        let metadata = self.metadata;
        for nav in metadata.find_navigations(current) {
            if nav.is_ignored(self.ignored) {
                continue;
            }
            let token = (nav.name.as_str(), &nav.target);
            if self.tokens.contains(&token) {
                continue;
            }

            let path = NavigationPath::join(prefix, &nav.name);
            self.paths.insert(path.clone());

            if depth + 1 >= self.max_depth || self.types.contains(&&nav.target) {
                continue;
            }

            self.tokens.push(token);
            self.types.push(&nav.target);
            self.visit(&nav.target, Some(&path), depth + 1);
            self.tokens.pop();
            self.types.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navrepo_core::{EntityTypeDescriptor, MetadataRegistry, NavigationDescriptor};

    fn orders() -> MetadataRegistry {
        MetadataRegistry::new()
            .with(
                EntityTypeDescriptor::new("Order")
                    .navigation(NavigationDescriptor::single("Customer", "Customer"))
                    .navigation(NavigationDescriptor::collection("Lines", "OrderLine")),
            )
            .with(EntityTypeDescriptor::new("Customer"))
            .with(
                EntityTypeDescriptor::new("OrderLine")
                    .navigation(NavigationDescriptor::single("Order", "Order")),
            )
    }

    fn paths(set: &IndexSet<NavigationPath>) -> Vec<&str> {
        set.iter().map(NavigationPath::as_str).collect()
    }

    #[test]
    fn order_graph_loads_back_reference_without_expanding_it() {
        let registry = orders();
        let root = EntityType::new("Order");
        let found = NavigationPathDiscoverer::new(&registry).discover(
            &root,
            DEFAULT_MAX_DEPTH,
            DEFAULT_IGNORE_MARKERS,
        );
        assert_eq!(paths(&found), vec!["Customer", "Lines", "Lines.Order"]);
        assert!(!found.contains(&NavigationPath::from("Lines.Order.Lines")));
    }

    #[test]
    fn self_reference_is_recorded_once() {
        let registry = MetadataRegistry::new().with(
            EntityTypeDescriptor::new("Employee")
                .navigation(NavigationDescriptor::single("Manager", "Employee"))
                .navigation(NavigationDescriptor::collection("Reports", "Employee")),
        );
        let root = EntityType::new("Employee");
        let found = NavigationPathDiscoverer::new(&registry).discover(&root, 10, &[] as &[&str]);
        assert_eq!(paths(&found), vec!["Manager", "Reports"]);
    }

    #[test]
    fn same_navigation_on_separate_branches_is_kept() {
        let registry = MetadataRegistry::new()
            .with(
                EntityTypeDescriptor::new("Invoice")
                    .navigation(NavigationDescriptor::single("Billing", "Address"))
                    .navigation(NavigationDescriptor::single("Shipping", "Address")),
            )
            .with(
                EntityTypeDescriptor::new("Address")
                    .navigation(NavigationDescriptor::single("Country", "Country")),
            )
            .with(EntityTypeDescriptor::new("Country"));
        let root = EntityType::new("Invoice");
        let found = NavigationPathDiscoverer::new(&registry).discover(&root, 10, &[] as &[&str]);
        assert_eq!(
            paths(&found),
            vec!["Billing", "Billing.Country", "Shipping", "Shipping.Country"]
        );
    }

    #[test]
    fn ignored_markers_skip_the_whole_subtree() {
        let registry = MetadataRegistry::new()
            .with(
                EntityTypeDescriptor::new("User")
                    .navigation(
                        NavigationDescriptor::collection("Sessions", "Session")
                            .with_marker("json_ignore"),
                    )
                    .navigation(NavigationDescriptor::single("Profile", "Profile")),
            )
            .with(
                EntityTypeDescriptor::new("Session")
                    .navigation(NavigationDescriptor::single("Device", "Profile")),
            )
            .with(EntityTypeDescriptor::new("Profile"));
        let root = EntityType::new("User");
        let discoverer = NavigationPathDiscoverer::new(&registry);

        let found = discoverer.discover(&root, 10, DEFAULT_IGNORE_MARKERS);
        assert_eq!(paths(&found), vec!["Profile"]);

        let everything = discoverer.discover(&root, 10, &[] as &[&str]);
        assert_eq!(paths(&everything), vec!["Sessions", "Sessions.Device", "Profile"]);
    }

    #[test]
    fn max_depth_bounds_path_length() {
        let registry = MetadataRegistry::new()
            .with(EntityTypeDescriptor::new("A").navigation(NavigationDescriptor::single("b", "B")))
            .with(EntityTypeDescriptor::new("B").navigation(NavigationDescriptor::single("c", "C")))
            .with(EntityTypeDescriptor::new("C").navigation(NavigationDescriptor::single("d", "D")))
            .with(EntityTypeDescriptor::new("D"));
        let root = EntityType::new("A");
        let discoverer = NavigationPathDiscoverer::new(&registry);

        assert_eq!(paths(&discoverer.discover(&root, 2, &[] as &[&str])), vec!["b", "b.c"]);
        assert!(discoverer.discover(&root, 0, &[] as &[&str]).is_empty());
        assert_eq!(discoverer.discover(&root, 100, &[] as &[&str]).len(), 3);
    }

    #[test]
    fn unknown_root_yields_nothing() {
        let registry = orders();
        let root = EntityType::new("Ghost");
        let found = NavigationPathDiscoverer::new(&registry).discover(&root, 10, &[] as &[&str]);
        assert!(found.is_empty());
    }
}
