use crate::api::error::ApiError;
use crate::model::{
    AssociationEdge, DefinitionRegistry, EntityDefinition, Filter, Id, Payload,
};

/// Build the parent filter for listing a nested collection. `child` is the
/// effective definition of the last path segment (reference side for
/// many-to-many), `parent` the definition it was reached from.
pub fn listing_filter(
    edge: &AssociationEdge,
    child: &EntityDefinition,
    parent: &EntityDefinition,
    parent_id: &Id,
) -> Result<Filter, ApiError> {
    match edge {
        AssociationEdge::OneToMany {
            reference_field, ..
        }
        | AssociationEdge::TranslationSet {
            reference_field, ..
        } => {
            // The child carries the foreign key column; filter on its
            // property name: e.g. unitPrices.productId = P1.
            let foreign_key = child.field_by_storage_name(reference_field).ok_or_else(|| {
                ApiError::Unsupported(format!(
                    "entity {} has no column {} to join {} on",
                    child.entity_name, reference_field, parent.entity_name
                ))
            })?;
            Ok(Filter::equals(
                format!("{}.{}", child.entity_name, foreign_key.property_name),
                parent_id.clone(),
            ))
        }
        AssociationEdge::ManyToMany { mapping_entity, .. } => {
            // Locate the inverse edge on the reference definition: the
            // association sharing the same junction, seen from the far side.
            // e.g. listing /product/P1/categories filters
            // category.products.id = P1.
            let inverse = child
                .associations()
                .find(|(_, candidate)| {
                    matches!(
                        candidate,
                        AssociationEdge::ManyToMany {
                            mapping_entity: other,
                            ..
                        } if other == mapping_entity
                    )
                })
                .map(|(property, _)| property)
                .ok_or_else(|| {
                    ApiError::Unsupported(format!(
                        "entity {} has no inverse association over junction {}",
                        child.entity_name, mapping_entity
                    ))
                })?;
            Ok(Filter::equals(
                format!("{}.{}.id", child.entity_name, inverse),
                parent_id.clone(),
            ))
        }
        AssociationEdge::ManyToOne { .. } => {
            // Reverse direction: find the one-to-many edge on the child
            // pointing back at the parent and filter through it, e.g.
            // product_manufacturer.products.id = P1.
            let reverse = child
                .associations()
                .find(|(_, candidate)| {
                    matches!(
                        candidate,
                        AssociationEdge::OneToMany {
                            reference_entity, ..
                        } if reference_entity == &parent.entity_name
                    )
                })
                .map(|(property, _)| property)
                .ok_or_else(|| {
                    ApiError::Unsupported(format!(
                        "entity {} has no one-to-many association back to {}",
                        child.entity_name, parent.entity_name
                    ))
                })?;
            Ok(Filter::equals(
                format!("{}.{}.id", child.entity_name, reverse),
                parent_id.clone(),
            ))
        }
    }
}

/// Primary-key map for deleting one junction row of a many-to-many edge.
/// Both column property names are resolved by storage name on the mapping
/// definition, per call.
pub fn junction_delete_keys(
    registry: &DefinitionRegistry,
    mapping_entity: &str,
    mapping_local_column: &str,
    mapping_reference_column: &str,
    parent_id: &Id,
    child_id: &Id,
) -> Result<(String, Payload), ApiError> {
    let mapping = registry
        .get(mapping_entity)
        .ok_or_else(|| ApiError::Unsupported(format!("unregistered junction {mapping_entity}")))?;
    let local = mapping
        .field_by_storage_name(mapping_local_column)
        .ok_or_else(|| {
            ApiError::Unsupported(format!(
                "junction {} has no column {}",
                mapping_entity, mapping_local_column
            ))
        })?;
    let reference = mapping
        .field_by_storage_name(mapping_reference_column)
        .ok_or_else(|| {
            ApiError::Unsupported(format!(
                "junction {} has no column {}",
                mapping_entity, mapping_reference_column
            ))
        })?;

    let mut keys = Payload::new();
    keys.insert(local.property_name.clone(), parent_id.clone().into());
    keys.insert(reference.property_name.clone(), child_id.clone().into());
    Ok((mapping_entity.to_string(), keys))
}

/// Composite key for deleting one translation row: the foreign reference
/// column resolved from the translation definition's fields, the language
/// column from its primary keys.
pub fn translation_delete_keys(
    translation: &EntityDefinition,
    reference_field: &str,
    language_field: &str,
    parent_id: &Id,
    language_id: &Id,
) -> Result<Payload, ApiError> {
    let reference = translation
        .field_by_storage_name(reference_field)
        .ok_or_else(|| {
            ApiError::Unsupported(format!(
                "translation {} has no column {}",
                translation.entity_name, reference_field
            ))
        })?;
    let language = translation
        .primary_key_by_storage_name(language_field)
        .ok_or_else(|| {
            ApiError::Unsupported(format!(
                "translation {} has no primary key column {}",
                translation.entity_name, language_field
            ))
        })?;

    let mut keys = Payload::new();
    keys.insert(reference.property_name.clone(), parent_id.clone().into());
    keys.insert(language.property_name.clone(), language_id.clone().into());
    Ok(keys)
}
