//! The metadata contract ("type → navigations", "type → key fields") and an
//! in-memory registry implementing it.
//!
//! [`MetadataRegistry`] is built either with the builder API or from a JSON
//! schema document:
//!
//! ```json
//! { "entities": [
//!     { "name": "Order",
//!       "fields": ["id", "customer_id"],
//!       "keys": [{ "name": "id", "kind": "int" }],
//!       "navigations": [
//!         { "name": "Customer", "target": "Customer",
//!           "join": { "local": "customer_id", "remote": "id" } } ] } ] }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entity::{EntityType, EntityTypeDescriptor, KeyFieldDescriptor, NavigationDescriptor};
use crate::error::ConfigurationError;

/// Supplies entity type descriptors to the query layer.
///
/// Implementations must be cheap to call repeatedly; the query layer caches
/// what it derives from them, not the descriptors themselves.
pub trait EntityMetadataProvider: Send + Sync {
    /// Full descriptor, `None` for unknown types.
    fn describe(&self, entity_type: &EntityType) -> Option<&EntityTypeDescriptor>;

    /// Declared navigations; empty for unknown types.
    fn find_navigations(&self, entity_type: &EntityType) -> &[NavigationDescriptor] {
        self.describe(entity_type)
            .map(|d| d.navigations.as_slice())
            .unwrap_or(&[])
    }

    /// Declared primary key fields in declaration order; empty for unknown
    /// types and keyless types.
    fn find_primary_key(&self, entity_type: &EntityType) -> &[KeyFieldDescriptor] {
        self.describe(entity_type)
            .map(|d| d.keys.as_slice())
            .unwrap_or(&[])
    }
}

/// Serialized form of a [`MetadataRegistry`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub entities: Vec<EntityTypeDescriptor>,
}

/// In-memory [`EntityMetadataProvider`].
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    entities: IndexMap<EntityType, EntityTypeDescriptor>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        MetadataRegistry {
            entities: IndexMap::new(),
        }
    }

    /// Builder-style registration.
    pub fn with(mut self, descriptor: EntityTypeDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// Registers (or replaces) a descriptor.
    pub fn register(&mut self, descriptor: EntityTypeDescriptor) {
        self.entities
            .insert(descriptor.entity_type.clone(), descriptor);
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &EntityType> {
        self.entities.keys()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Builds a registry from a schema document and validates it.
    pub fn from_document(document: SchemaDocument) -> Result<Self, ConfigurationError> {
        let mut registry = MetadataRegistry::new();
        for descriptor in document.entities {
            if registry.entities.contains_key(&descriptor.entity_type) {
                return Err(ConfigurationError::InvalidSchema {
                    reason: format!("duplicate entity type '{}'", descriptor.entity_type),
                });
            }
            registry.register(descriptor);
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Parses a JSON schema document.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let document: SchemaDocument =
            serde_json::from_str(json).map_err(|e| ConfigurationError::InvalidSchema {
                reason: e.to_string(),
            })?;
        Self::from_document(document)
    }

    pub fn to_document(&self) -> SchemaDocument {
        SchemaDocument {
            entities: self.entities.values().cloned().collect(),
        }
    }

    /// Checks that every navigation targets a registered type and that
    /// navigation and key names are unique per type.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for descriptor in self.entities.values() {
            let ty = &descriptor.entity_type;
            for (i, nav) in descriptor.navigations.iter().enumerate() {
                if !self.entities.contains_key(&nav.target) {
                    return Err(ConfigurationError::InvalidSchema {
                        reason: format!(
                            "navigation '{}.{}' targets unknown type '{}'",
                            ty, nav.name, nav.target
                        ),
                    });
                }
                if descriptor.navigations[..i].iter().any(|n| n.name == nav.name) {
                    return Err(ConfigurationError::InvalidSchema {
                        reason: format!("duplicate navigation '{}.{}'", ty, nav.name),
                    });
                }
            }
            for (i, key) in descriptor.keys.iter().enumerate() {
                if descriptor.keys[..i].iter().any(|k| k.name == key.name) {
                    return Err(ConfigurationError::InvalidSchema {
                        reason: format!("duplicate key field '{}.{}'", ty, key.name),
                    });
                }
            }
        }
        Ok(())
    }
}

impl EntityMetadataProvider for MetadataRegistry {
    fn describe(&self, entity_type: &EntityType) -> Option<&EntityTypeDescriptor> {
        self.entities.get(entity_type)
    }
}
