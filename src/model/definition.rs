use crate::model::DataType;
use serde::{Deserialize, Serialize};

/// Schema descriptor for one resource type. Immutable once registered;
/// always shared as `Arc<EntityDefinition>` via the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub entity_name: String,
    pub fields: Vec<Field>,
}

impl EntityDefinition {
    pub fn new(entity_name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            entity_name: entity_name.into(),
            fields,
        }
    }

    /// Look up a field by its programmatic (camelCase) property name.
    pub fn field(&self, property_name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|field| field.property_name == property_name)
    }

    /// Look up a field by its storage column name.
    pub fn field_by_storage_name(&self, storage_name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|field| field.storage_name == storage_name)
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|field| field.is_primary_key())
    }

    pub fn primary_key_by_storage_name(&self, storage_name: &str) -> Option<&Field> {
        self.primary_keys()
            .find(|field| field.storage_name == storage_name)
    }

    pub fn association(&self, property_name: &str) -> Option<&AssociationEdge> {
        match self.field(property_name)?.kind {
            FieldKind::Association(ref edge) => Some(edge),
            FieldKind::Scalar { .. } => None,
        }
    }

    /// Iterate all association edges together with their property names.
    pub fn associations(&self) -> impl Iterator<Item = (&str, &AssociationEdge)> {
        self.fields.iter().filter_map(|field| match field.kind {
            FieldKind::Association(ref edge) => Some((field.property_name.as_str(), edge)),
            FieldKind::Scalar { .. } => None,
        })
    }
}

/// A named attribute or association on an entity definition. Carries both
/// naming domains: `property_name` (programmatic, camelCase) and
/// `storage_name` (storage column, snake_case).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub property_name: String,
    pub storage_name: String,
    pub kind: FieldKind,
}

impl Field {
    pub fn scalar(
        property_name: impl Into<String>,
        storage_name: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self {
            property_name: property_name.into(),
            storage_name: storage_name.into(),
            kind: FieldKind::Scalar {
                data_type,
                primary_key: false,
            },
        }
    }

    pub fn primary_key(
        property_name: impl Into<String>,
        storage_name: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self {
            property_name: property_name.into(),
            storage_name: storage_name.into(),
            kind: FieldKind::Scalar {
                data_type,
                primary_key: true,
            },
        }
    }

    pub fn association(
        property_name: impl Into<String>,
        storage_name: impl Into<String>,
        edge: AssociationEdge,
    ) -> Self {
        Self {
            property_name: property_name.into(),
            storage_name: storage_name.into(),
            kind: FieldKind::Association(edge),
        }
    }

    pub fn is_primary_key(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::Scalar {
                primary_key: true,
                ..
            }
        )
    }

    pub fn as_association(&self) -> Option<&AssociationEdge> {
        match self.kind {
            FieldKind::Association(ref edge) => Some(edge),
            FieldKind::Scalar { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Scalar {
        data_type: DataType,
        #[serde(default)]
        primary_key: bool,
    },
    Association(AssociationEdge),
}

/// Typed relationship between two entity definitions. Target entities are
/// referenced by name and resolved through the registry, which keeps
/// definitions acyclic and serializable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssociationEdge {
    /// The owning side carries the foreign key column named `storage_name`.
    ManyToOne {
        reference_entity: String,
        storage_name: String,
    },
    /// The referenced (child) entity carries the foreign key column named
    /// `reference_field`.
    OneToMany {
        reference_entity: String,
        reference_field: String,
    },
    /// Backed by a junction definition; `mapping_local_column` points at the
    /// owning side, `mapping_reference_column` at the far side.
    ManyToMany {
        reference_entity: String,
        mapping_entity: String,
        mapping_local_column: String,
        mapping_reference_column: String,
    },
    /// Translation rows keyed by {foreign reference column, language column}.
    TranslationSet {
        reference_entity: String,
        reference_field: String,
        language_field: String,
    },
}

impl AssociationEdge {
    /// The definition a path hop advances to: for many-to-many this is the
    /// far side of the junction, never the junction itself.
    pub fn reference_entity(&self) -> &str {
        match self {
            Self::ManyToOne {
                reference_entity, ..
            }
            | Self::OneToMany {
                reference_entity, ..
            }
            | Self::ManyToMany {
                reference_entity, ..
            }
            | Self::TranslationSet {
                reference_entity, ..
            } => reference_entity,
        }
    }
}
