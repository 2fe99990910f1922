//! Entity type identity and the descriptors a metadata provider hands out.
//!
//! [`EntityType`] is a cheap-to-clone newtype over `Arc<str>` so it can be
//! used as a key in every per-type cache without reallocating. The
//! descriptor types ([`NavigationDescriptor`], [`KeyFieldDescriptor`],
//! [`EntityTypeDescriptor`]) are owned by whoever implements
//! [`EntityMetadataProvider`](crate::metadata::EntityMetadataProvider); the
//! query layer only reads them.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::value::ValueKind;

/// Identity of an entity type (e.g. `Order`, `OrderLine`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct EntityType(Arc<str>);

impl EntityType {
    /// Creates an entity type from its name.
    pub fn new(name: &str) -> Self {
        EntityType(Arc::from(name))
    }

    /// Returns the type name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityType {
    fn from(name: &str) -> Self {
        EntityType::new(name)
    }
}

impl From<String> for EntityType {
    fn from(name: String) -> Self {
        EntityType(Arc::from(name))
    }
}

impl From<EntityType> for String {
    fn from(ty: EntityType) -> Self {
        ty.0.to_string()
    }
}

/// How a store resolves a navigation: `source.local == target.remote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    /// Field on the declaring entity.
    pub local: String,
    /// Field on the target entity.
    pub remote: String,
}

impl Join {
    pub fn new(local: &str, remote: &str) -> Self {
        Join {
            local: local.to_string(),
            remote: remote.to_string(),
        }
    }
}

fn default_writable() -> bool {
    true
}

/// A declared relationship from one entity type to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationDescriptor {
    /// Navigation name, used as a load-path segment.
    pub name: String,
    /// Target entity type. For collections this is the element type.
    pub target: EntityType,
    /// Whether the navigation holds many related entities.
    #[serde(default, rename = "collection")]
    pub is_collection: bool,
    /// Read-only navigations are skipped when clearing relationships.
    #[serde(default = "default_writable")]
    pub writable: bool,
    /// Attribute-like markers (e.g. `json_ignore`) consulted by discovery.
    #[serde(default)]
    pub markers: Vec<String>,
    /// Join used by stores to materialize the navigation.
    #[serde(default)]
    pub join: Option<Join>,
}

impl NavigationDescriptor {
    /// A writable single-valued navigation.
    pub fn single(name: &str, target: impl Into<EntityType>) -> Self {
        NavigationDescriptor {
            name: name.to_string(),
            target: target.into(),
            is_collection: false,
            writable: true,
            markers: Vec::new(),
            join: None,
        }
    }

    /// A writable collection navigation.
    pub fn collection(name: &str, target: impl Into<EntityType>) -> Self {
        NavigationDescriptor {
            is_collection: true,
            ..Self::single(name, target)
        }
    }

    pub fn with_join(mut self, local: &str, remote: &str) -> Self {
        self.join = Some(Join::new(local, remote));
        self
    }

    pub fn with_marker(mut self, marker: &str) -> Self {
        self.markers.push(marker.to_string());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Returns `true` if any of the navigation's markers is in `ignored`.
    pub fn is_ignored<S: AsRef<str>>(&self, ignored: &[S]) -> bool {
        self.markers
            .iter()
            .any(|m| ignored.iter().any(|i| i.as_ref() == m))
    }
}

/// One field of a primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFieldDescriptor {
    pub name: String,
    pub kind: ValueKind,
    /// Position within a composite key; predicates are chained in this order.
    #[serde(default)]
    pub ordinal: u32,
}

impl KeyFieldDescriptor {
    pub fn new(name: &str, kind: ValueKind, ordinal: u32) -> Self {
        KeyFieldDescriptor {
            name: name.to_string(),
            kind,
            ordinal,
        }
    }
}

/// Primary key fields, usually one or two.
pub type KeyFields = SmallVec<[KeyFieldDescriptor; 2]>;

/// Everything the metadata provider knows about one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypeDescriptor {
    #[serde(rename = "name")]
    pub entity_type: EntityType,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub keys: KeyFields,
    #[serde(default)]
    pub navigations: Vec<NavigationDescriptor>,
}

impl EntityTypeDescriptor {
    pub fn new(entity_type: impl Into<EntityType>) -> Self {
        EntityTypeDescriptor {
            entity_type: entity_type.into(),
            fields: Vec::new(),
            keys: KeyFields::new(),
            navigations: Vec::new(),
        }
    }

    /// Adds a plain scalar field name.
    pub fn field(mut self, name: &str) -> Self {
        self.fields.push(name.to_string());
        self
    }

    /// Adds a primary key field. The ordinal is its position among keys.
    pub fn key(mut self, name: &str, kind: ValueKind) -> Self {
        let ordinal = self.keys.len() as u32;
        self.keys.push(KeyFieldDescriptor::new(name, kind, ordinal));
        self
    }

    pub fn navigation(mut self, navigation: NavigationDescriptor) -> Self {
        self.navigations.push(navigation);
        self
    }

    /// Key fields sorted by ordinal.
    pub fn ordered_keys(&self) -> KeyFields {
        let mut keys = self.keys.clone();
        keys.sort_by_key(|k| k.ordinal);
        keys
    }

    pub fn find_navigation(&self, name: &str) -> Option<&NavigationDescriptor> {
        self.navigations.iter().find(|n| n.name == name)
    }
}
