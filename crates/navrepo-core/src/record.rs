//! Dynamic entity instances.
//!
//! A [`Record`] carries its [`EntityType`], scalar fields and navigation
//! slots. Stores materialize navigations into the slots when a query asks
//! for them through load-paths; everything else in the workspace treats the
//! slots as opaque.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entity::EntityType;
use crate::value::Value;

/// Content of a navigation slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Related {
    /// Not loaded, or no related entity.
    #[default]
    Absent,
    One(Box<Record>),
    Many(Vec<Record>),
}

impl Related {
    /// `true` for `Absent` and for an empty collection.
    pub fn is_empty(&self) -> bool {
        match self {
            Related::Absent => true,
            Related::One(_) => false,
            Related::Many(items) => items.is_empty(),
        }
    }

    /// Related records as a slice-like iterator regardless of cardinality.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        let (one, many): (Option<&Record>, &[Record]) = match self {
            Related::Absent => (None, &[]),
            Related::One(r) => (Some(r.as_ref()), &[]),
            Related::Many(items) => (None, items.as_slice()),
        };
        one.into_iter().chain(many.iter())
    }

    pub fn records_mut(&mut self) -> Vec<&mut Record> {
        match self {
            Related::Absent => Vec::new(),
            Related::One(r) => vec![r.as_mut()],
            Related::Many(items) => items.iter_mut().collect(),
        }
    }
}

/// A dynamic entity instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub entity_type: EntityType,
    #[serde(default)]
    pub fields: IndexMap<String, Value>,
    #[serde(default)]
    pub navigations: IndexMap<String, Related>,
}

impl Record {
    pub fn new(entity_type: impl Into<EntityType>) -> Self {
        Record {
            entity_type: entity_type.into(),
            fields: IndexMap::new(),
            navigations: IndexMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.fields.insert(name.to_string(), value.into());
    }

    /// Field value, [`Value::Null`] when the field is missing.
    pub fn get(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&Value::Null)
    }

    pub fn related(&self, navigation: &str) -> &Related {
        static ABSENT: Related = Related::Absent;
        self.navigations.get(navigation).unwrap_or(&ABSENT)
    }

    pub fn set_related(&mut self, navigation: &str, related: Related) {
        self.navigations.insert(navigation.to_string(), related);
    }

    /// Follows a dot-joined path and returns every record reached at its end.
    pub fn walk(&self, path: &str) -> Vec<&Record> {
        let mut frontier = vec![self];
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            frontier = frontier
                .into_iter()
                .flat_map(|r| r.related(segment).records())
                .collect();
        }
        frontier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_with_lines() -> Record {
        let line = |id: i64| Record::new("OrderLine").with("id", id).with("order_id", 1);
        let mut order = Record::new("Order").with("id", 1);
        order.set_related("Lines", Related::Many(vec![line(10), line(11)]));
        order.set_related(
            "Customer",
            Related::One(Box::new(Record::new("Customer").with("id", 5))),
        );
        order
    }

    #[test]
    fn missing_field_reads_as_null() {
        let order = Record::new("Order");
        assert_eq!(order.get("nope"), &Value::Null);
    }

    #[test]
    fn missing_navigation_reads_as_absent() {
        let order = Record::new("Order");
        assert!(order.related("Lines").is_empty());
    }

    #[test]
    fn walk_follows_single_and_collection_segments() {
        let order = order_with_lines();
        assert_eq!(order.walk("Lines").len(), 2);
        assert_eq!(order.walk("Customer")[0].get("id"), &Value::Int(5));
        assert!(order.walk("Lines.Order").is_empty());
    }

    #[test]
    fn empty_collection_counts_as_empty() {
        assert!(Related::Many(Vec::new()).is_empty());
        assert!(!Related::One(Box::new(Record::new("X"))).is_empty());
    }
}
