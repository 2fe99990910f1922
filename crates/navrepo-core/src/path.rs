//! Dot-joined navigation load-paths (e.g. `Lines.Product`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A load-path from a root entity type through its navigations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavigationPath(String);

impl NavigationPath {
    /// A one-segment path.
    pub fn root(segment: &str) -> Self {
        NavigationPath(segment.to_string())
    }

    /// Extends the path with one more segment.
    pub fn child(&self, segment: &str) -> Self {
        NavigationPath(format!("{}.{}", self.0, segment))
    }

    /// `prefix.segment`, or just `segment` when there is no prefix.
    pub fn join(prefix: Option<&NavigationPath>, segment: &str) -> Self {
        match prefix {
            Some(p) => p.child(segment),
            None => Self::root(segment),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }
}

impl fmt::Display for NavigationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NavigationPath {
    fn from(path: &str) -> Self {
        NavigationPath(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_and_depth() {
        let lines = NavigationPath::join(None, "Lines");
        let order = NavigationPath::join(Some(&lines), "Order");
        assert_eq!(order.as_str(), "Lines.Order");
        assert_eq!(order.depth(), 2);
        assert_eq!(order.segments().collect::<Vec<_>>(), vec!["Lines", "Order"]);
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&NavigationPath::from("A.B")).unwrap();
        assert_eq!(json, "\"A.B\"");
    }
}
