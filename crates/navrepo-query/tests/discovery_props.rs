//! Property tests for load-path discovery over generated relationship graphs.

use std::collections::HashSet;

use proptest::prelude::*;

use navrepo_core::{
    EntityMetadataProvider, EntityType, EntityTypeDescriptor, MetadataRegistry,
    NavigationDescriptor, NavigationPath,
};
use navrepo_query::NavigationPathDiscoverer;

/// Entity `T{i}` gets one navigation `n{j}` per entry of `edges[i]`,
/// targeting `T{edges[i][j]}`, collections on odd `j`.
fn build(edges: &[Vec<usize>]) -> MetadataRegistry {
    let mut registry = MetadataRegistry::new();
    for (i, targets) in edges.iter().enumerate() {
        let mut descriptor = EntityTypeDescriptor::new(format!("T{i}"));
        for (j, target) in targets.iter().enumerate() {
            let name = format!("n{j}");
            let target = format!("T{target}");
            descriptor = descriptor.navigation(if j % 2 == 1 {
                NavigationDescriptor::collection(&name, target)
            } else {
                NavigationDescriptor::single(&name, target)
            });
        }
        registry.register(descriptor);
    }
    registry
}

/// `(name, target)` tokens along `path`, resolved through the metadata.
fn tokens(registry: &MetadataRegistry, root: &EntityType, path: &NavigationPath) -> Vec<(String, EntityType)> {
    let mut current = root.clone();
    let mut out = Vec::new();
    for segment in path.segments() {
        let nav = registry
            .find_navigations(&current)
            .iter()
            .find(|n| n.name == segment)
            .expect("every discovered segment resolves");
        out.push((nav.name.clone(), nav.target.clone()));
        current = nav.target.clone();
    }
    out
}

fn graphs() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..6).prop_flat_map(|n| {
        prop::collection::vec(prop::collection::vec(0..n, 0..4), n)
    })
}

proptest! {
    #[test]
    fn discovery_terminates_within_bounds(edges in graphs(), max_depth in 0usize..8) {
        let registry = build(&edges);
        let root = EntityType::new("T0");
        let paths = NavigationPathDiscoverer::new(&registry).discover(&root, max_depth, &[] as &[&str]);

        for path in &paths {
            prop_assert!(path.depth() >= 1);
            prop_assert!(path.depth() <= max_depth);

            let walked = tokens(&registry, &root, path);
            let unique: HashSet<_> = walked.iter().collect();
            prop_assert_eq!(unique.len(), walked.len(), "token repeated in {}", path);

            // every prefix was recorded too
            let segments: Vec<&str> = path.segments().collect();
            for end in 1..segments.len() {
                let prefix = NavigationPath::from(segments[..end].join(".").as_str());
                prop_assert!(paths.contains(&prefix), "missing prefix {} of {}", prefix, path);
            }
        }
    }

    #[test]
    fn discovery_is_deterministic(edges in graphs(), max_depth in 1usize..6) {
        let registry = build(&edges);
        let root = EntityType::new("T0");
        let discoverer = NavigationPathDiscoverer::new(&registry);
        let first: Vec<_> = discoverer.discover(&root, max_depth, &[] as &[&str]).into_iter().collect();
        let second: Vec<_> = discoverer.discover(&root, max_depth, &[] as &[&str]).into_iter().collect();
        prop_assert_eq!(first, second);
    }
}
