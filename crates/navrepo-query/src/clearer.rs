//! Resets navigation slots before a root-only write.

use std::sync::Arc;

use dashmap::DashMap;

use navrepo_core::{ConfigurationError, EntityMetadataProvider, EntityType, Record, Related};

type ClearFn = Arc<dyn Fn(&mut Record) + Send + Sync>;

/// Caches one clearing delegate per entity type.
pub struct RelationshipClearer {
    metadata: Arc<dyn EntityMetadataProvider>,
    delegates: DashMap<EntityType, ClearFn>,
}

impl RelationshipClearer {
    pub fn new(metadata: Arc<dyn EntityMetadataProvider>) -> Self {
        RelationshipClearer {
            metadata,
            delegates: DashMap::new(),
        }
    }

    /// Sets every writable direct navigation of `record` to its empty value:
    /// `Absent` for references, an empty `Many` for collections. Scalar
    /// fields and nested records are left alone.
    pub fn clear(&self, record: &mut Record) -> Result<(), ConfigurationError> {
        let delegate = self.delegate(&record.entity_type)?;
        delegate(record);
        Ok(())
    }

    fn delegate(&self, entity_type: &EntityType) -> Result<ClearFn, ConfigurationError> {
        if let Some(hit) = self.delegates.get(entity_type) {
            return Ok(Arc::clone(hit.value()));
        }

        let descriptor =
            self.metadata
                .describe(entity_type)
                .ok_or_else(|| ConfigurationError::UnknownEntityType {
                    entity_type: entity_type.clone(),
                })?;
        let slots: Vec<(String, bool)> = descriptor
            .navigations
            .iter()
            .filter(|n| n.writable)
            .map(|n| (n.name.clone(), n.is_collection))
            .collect();

        let delegate: ClearFn = Arc::new(move |record: &mut Record| {
            for (name, is_collection) in &slots {
                let empty = if *is_collection {
                    Related::Many(Vec::new())
                } else {
                    Related::Absent
                };
                record.set_related(name, empty);
            }
        });

        let entry = self.delegates.entry(entity_type.clone()).or_insert(delegate);
        Ok(Arc::clone(entry.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navrepo_core::{EntityTypeDescriptor, MetadataRegistry, NavigationDescriptor, Value};

    fn clearer() -> RelationshipClearer {
        let registry = MetadataRegistry::new()
            .with(
                EntityTypeDescriptor::new("Order")
                    .field("total")
                    .navigation(NavigationDescriptor::single("Customer", "Customer"))
                    .navigation(NavigationDescriptor::collection("Lines", "OrderLine"))
                    .navigation(NavigationDescriptor::single("Summary", "Customer").read_only()),
            )
            .with(EntityTypeDescriptor::new("Customer"))
            .with(EntityTypeDescriptor::new("OrderLine"));
        RelationshipClearer::new(Arc::new(registry))
    }

    #[test]
    fn clears_writable_navigations_only() {
        let clearer = clearer();
        let mut order = Record::new("Order").with("total", 12i64);
        order.set_related("Customer", Related::One(Box::new(Record::new("Customer"))));
        order.set_related("Lines", Related::Many(vec![Record::new("OrderLine")]));
        order.set_related("Summary", Related::One(Box::new(Record::new("Customer"))));

        clearer.clear(&mut order).unwrap();

        assert_eq!(order.related("Customer"), &Related::Absent);
        assert_eq!(order.related("Lines"), &Related::Many(Vec::new()));
        assert!(matches!(order.related("Summary"), Related::One(_)));
        assert_eq!(order.get("total"), &Value::Int(12));
    }

    #[test]
    fn type_without_navigations_is_untouched() {
        let clearer = clearer();
        let mut customer = Record::new("Customer").with("name", "Ada");
        let before = customer.clone();
        clearer.clear(&mut customer).unwrap();
        assert_eq!(customer, before);
    }

    #[test]
    fn unknown_type_is_a_configuration_error() {
        let clearer = clearer();
        let mut ghost = Record::new("Ghost");
        assert!(matches!(
            clearer.clear(&mut ghost),
            Err(ConfigurationError::UnknownEntityType { .. })
        ));
    }
}
