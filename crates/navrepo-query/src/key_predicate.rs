//! Primary-key predicate builders.
//!
//! The first request for an entity type reads its key fields from the
//! metadata provider and caches a builder closure; later calls reuse it.
//! Single-field and composite builders are cached separately.

use std::sync::Arc;

use dashmap::DashMap;

use navrepo_core::{
    ConfigurationError, EntityMetadataProvider, EntityType, KeyFieldDescriptor, KeyFields,
    Predicate, Record, Value,
};

pub type SingleKeyBuilder = Arc<dyn Fn(Value) -> Result<Predicate, ConfigurationError> + Send + Sync>;
pub type CompositeKeyBuilder =
    Arc<dyn Fn(&[Value]) -> Result<Predicate, ConfigurationError> + Send + Sync>;

/// A primary-key value as supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValues {
    Single(Value),
    Composite(Vec<Value>),
}

impl From<Value> for KeyValues {
    fn from(value: Value) -> Self {
        KeyValues::Single(value)
    }
}

impl From<i64> for KeyValues {
    fn from(value: i64) -> Self {
        KeyValues::Single(value.into())
    }
}

impl From<&str> for KeyValues {
    fn from(value: &str) -> Self {
        KeyValues::Single(value.into())
    }
}

impl From<uuid::Uuid> for KeyValues {
    fn from(value: uuid::Uuid) -> Self {
        KeyValues::Single(value.into())
    }
}

impl From<Vec<Value>> for KeyValues {
    fn from(values: Vec<Value>) -> Self {
        KeyValues::Composite(values)
    }
}

impl<A: Into<Value>, B: Into<Value>> From<(A, B)> for KeyValues {
    fn from((a, b): (A, B)) -> Self {
        KeyValues::Composite(vec![a.into(), b.into()])
    }
}

impl<A: Into<Value>, B: Into<Value>, C: Into<Value>> From<(A, B, C)> for KeyValues {
    fn from((a, b, c): (A, B, C)) -> Self {
        KeyValues::Composite(vec![a.into(), b.into(), c.into()])
    }
}

pub struct KeyPredicateCompiler {
    metadata: Arc<dyn EntityMetadataProvider>,
    single: DashMap<EntityType, SingleKeyBuilder>,
    composite: DashMap<EntityType, CompositeKeyBuilder>,
}

impl KeyPredicateCompiler {
    pub fn new(metadata: Arc<dyn EntityMetadataProvider>) -> Self {
        KeyPredicateCompiler {
            metadata,
            single: DashMap::new(),
            composite: DashMap::new(),
        }
    }

    /// Builder for an entity type with a one-field key.
    pub fn single_key_builder(
        &self,
        entity_type: &EntityType,
    ) -> Result<SingleKeyBuilder, ConfigurationError> {
        if let Some(hit) = self.single.get(entity_type) {
            return Ok(Arc::clone(hit.value()));
        }

        let keys = self.key_fields(entity_type)?;
        if keys.len() != 1 {
            return Err(ConfigurationError::CompositeKey {
                entity_type: entity_type.clone(),
                arity: keys.len(),
            });
        }
        let field = keys[0].clone();
        let owner = entity_type.clone();
        let builder: SingleKeyBuilder = Arc::new(move |value: Value| {
            check_kind(&owner, &field, &value)?;
            Ok(Predicate::eq(&field.name, value))
        });

        let entry = self.single.entry(entity_type.clone()).or_insert(builder);
        Ok(Arc::clone(entry.value()))
    }

    /// Builder for an entity type with a multi-field key. Values are taken in
    /// key ordinal order.
    pub fn composite_key_builder(
        &self,
        entity_type: &EntityType,
    ) -> Result<CompositeKeyBuilder, ConfigurationError> {
        if let Some(hit) = self.composite.get(entity_type) {
            return Ok(Arc::clone(hit.value()));
        }

        let keys = self.key_fields(entity_type)?;
        if keys.len() < 2 {
            return Err(ConfigurationError::SingleKey {
                entity_type: entity_type.clone(),
            });
        }
        let owner = entity_type.clone();
        let builder: CompositeKeyBuilder = Arc::new(move |values: &[Value]| {
            if values.len() != keys.len() {
                return Err(ConfigurationError::KeyArityMismatch {
                    entity_type: owner.clone(),
                    expected: keys.len(),
                    actual: values.len(),
                });
            }
            let mut predicate = Predicate::True;
            for (field, value) in keys.iter().zip(values) {
                check_kind(&owner, field, value)?;
                predicate = predicate.and(Predicate::eq(&field.name, value.clone()));
            }
            Ok(predicate)
        });

        let entry = self.composite.entry(entity_type.clone()).or_insert(builder);
        Ok(Arc::clone(entry.value()))
    }

    pub fn predicate_for(
        &self,
        entity_type: &EntityType,
        key: &KeyValues,
    ) -> Result<Predicate, ConfigurationError> {
        match key {
            KeyValues::Single(value) => self.single_key_builder(entity_type)?(value.clone()),
            KeyValues::Composite(values) => self.composite_key_builder(entity_type)?(values),
        }
    }

    /// Predicate matching the stored row with `record`'s key values.
    pub fn predicate_for_record(&self, record: &Record) -> Result<Predicate, ConfigurationError> {
        let keys = self.key_fields(&record.entity_type)?;
        let key = if keys.len() == 1 {
            KeyValues::Single(record.get(&keys[0].name).clone())
        } else {
            KeyValues::Composite(keys.iter().map(|k| record.get(&k.name).clone()).collect())
        };
        self.predicate_for(&record.entity_type, &key)
    }

    fn key_fields(&self, entity_type: &EntityType) -> Result<KeyFields, ConfigurationError> {
        let descriptor =
            self.metadata
                .describe(entity_type)
                .ok_or_else(|| ConfigurationError::UnknownEntityType {
                    entity_type: entity_type.clone(),
                })?;
        let keys = descriptor.ordered_keys();
        if keys.is_empty() {
            return Err(ConfigurationError::NoPrimaryKey {
                entity_type: entity_type.clone(),
            });
        }
        Ok(keys)
    }
}

fn check_kind(
    entity_type: &EntityType,
    field: &KeyFieldDescriptor,
    value: &Value,
) -> Result<(), ConfigurationError> {
    match value.kind() {
        Some(kind) if kind == field.kind => Ok(()),
        actual => Err(ConfigurationError::KeyKindMismatch {
            entity_type: entity_type.clone(),
            field: field.name.clone(),
            expected: field.kind,
            actual: actual.map_or_else(|| "null".to_string(), |k| k.to_string()),
        }),
    }
}
