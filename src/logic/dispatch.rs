use crate::api::body::is_collection;
use crate::api::error::ApiError;
use crate::logic::association::{junction_delete_keys, listing_filter, translation_delete_keys};
use crate::logic::resolve::PathSegment;
use crate::model::{
    AssociationEdge, Criteria, DefinitionRegistry, EntityDefinition, EntityRow, Id, Payload,
    SearchResult, WriteVerb, WrittenResult,
};
use crate::store::traits::{Repository, Store};
use serde_json::Value;
use std::sync::Arc;

/// What a write resolved to: the definition the response should be shaped
/// against and the id of the row that was written.
#[derive(Debug)]
pub struct WriteOutcome {
    pub definition: Arc<EntityDefinition>,
    pub id: Id,
}

fn repository<S: Store>(
    store: &S,
    definition: &EntityDefinition,
) -> Result<Arc<dyn Repository>, ApiError> {
    store
        .repository(&definition.entity_name)
        .ok_or_else(|| ApiError::RepositoryNotFound {
            entity: definition.entity_name.clone(),
        })
}

/// Returns a new payload with one extra field. Injection never mutates the
/// caller's map in place.
fn with_field(payload: Payload, property: &str, value: Value) -> Payload {
    let mut payload = payload;
    payload.insert(property.to_string(), value);
    payload
}

fn last_and_parent(segments: &[PathSegment]) -> (&PathSegment, &PathSegment) {
    let last = &segments[segments.len() - 1];
    let parent = &segments[segments.len() - 2];
    (last, parent)
}

fn parent_id(parent: &PathSegment) -> Result<Id, ApiError> {
    parent.value.clone().ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Nested access to \"{}\" requires an identifier on the parent segment.",
            parent.entity
        ))
    })
}

async fn execute_write_operation(
    repository: &dyn Repository,
    payload: Payload,
    verb: WriteVerb,
) -> Result<WrittenResult, ApiError> {
    let result = match verb {
        WriteVerb::Create => repository.create(vec![payload]).await?,
        WriteVerb::Update => repository.update(vec![payload]).await?,
    };
    Ok(result)
}

fn written_id(result: &WrittenResult, definition: &EntityDefinition) -> Result<Id, ApiError> {
    result
        .event_for(&definition.entity_name)
        .and_then(|event| event.ids.last().cloned())
        .ok_or_else(|| {
            ApiError::Unsupported(format!(
                "write against {} produced no written event",
                definition.entity_name
            ))
        })
}

/// GET detail: read a single row on the last segment's effective definition.
pub async fn fetch_detail<S: Store>(
    store: &S,
    segments: &[PathSegment],
) -> Result<(Arc<EntityDefinition>, EntityRow), ApiError> {
    let last = segments.last().expect("segment chain is never empty");
    let id = last.value.clone().ok_or_else(|| {
        ApiError::BadRequest("Detail access requires an identifier.".to_string())
    })?;
    let definition = last.definition.clone();

    let repository = repository(store, &definition)?;
    let rows = repository.read(std::slice::from_ref(&id)).await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::ResourceNotFound {
            entity: definition.entity_name.clone(),
            primary_key: format!("id={id}"),
        })?;

    Ok((definition, row))
}

/// GET listing: root collections search directly; nested collections get the
/// classifier-derived parent filter attached first.
pub async fn fetch_listing<S: Store>(
    store: &S,
    segments: &[PathSegment],
    mut criteria: Criteria,
) -> Result<(Arc<EntityDefinition>, SearchResult), ApiError> {
    let first = &segments[0];

    if segments.len() == 1 {
        let repository = repository(store, &first.definition)?;
        let result = repository.search(&criteria).await?;
        return Ok((first.definition.clone(), result));
    }

    let (child, parent) = last_and_parent(segments);
    let edge = child
        .edge
        .as_ref()
        .ok_or_else(|| ApiError::Unsupported("non-root segment without an edge".to_string()))?;
    let parent_id = parent_id(parent)?;

    criteria.add_filter(listing_filter(
        edge,
        &child.definition,
        &parent.definition,
        &parent_id,
    )?);

    let repository = repository(store, &child.definition)?;
    let result = repository.search(&criteria).await?;
    Ok((child.definition.clone(), result))
}

/// POST/PATCH: the verb × association-kind write table. Multi-step branches
/// (many-to-one, many-to-many) are explicitly non-atomic: when the second
/// call fails the first write stays and the failure propagates.
pub async fn write<S: Store>(
    store: &S,
    segments: &[PathSegment],
    verb: WriteVerb,
    payload: Payload,
) -> Result<WriteOutcome, ApiError> {
    if is_collection(&payload) {
        return Err(ApiError::BadRequest(
            "Only single write operations are supported. Please send the entities one by one."
                .to_string(),
        ));
    }

    let last = segments.last().expect("segment chain is never empty");

    if verb == WriteVerb::Create && last.value.is_some() {
        return Err(ApiError::MethodNotAllowed {
            allowed: "GET, PATCH, DELETE".to_string(),
        });
    }

    let payload = match (verb, &last.value) {
        (WriteVerb::Update, Some(id)) => with_field(payload, "id", Value::String(id.clone())),
        _ => payload,
    };

    if segments.len() == 1 {
        let definition = segments[0].definition.clone();
        let repository = repository(store, &definition)?;
        let result = execute_write_operation(&*repository, payload, verb).await?;
        let id = written_id(&result, &definition)?;
        return Ok(WriteOutcome { definition, id });
    }

    let (child, parent) = last_and_parent(segments);
    let edge = child
        .edge
        .as_ref()
        .ok_or_else(|| ApiError::Unsupported("non-root segment without an edge".to_string()))?;
    let parent_id = parent_id(parent)?;

    match edge {
        AssociationEdge::OneToMany {
            reference_field, ..
        }
        | AssociationEdge::TranslationSet {
            reference_field, ..
        } => {
            // The child carries the foreign key; inject the parent id before
            // delegating to the child's repository.
            let foreign_key = child
                .definition
                .field_by_storage_name(reference_field)
                .ok_or_else(|| {
                    ApiError::Unsupported(format!(
                        "entity {} has no column {}",
                        child.definition.entity_name, reference_field
                    ))
                })?;
            let payload = with_field(
                payload,
                &foreign_key.property_name,
                Value::String(parent_id),
            );

            let repository = repository(store, &child.definition)?;
            let result = execute_write_operation(&*repository, payload, verb).await?;
            let id = written_id(&result, &child.definition)?;
            Ok(WriteOutcome {
                definition: child.definition.clone(),
                id,
            })
        }
        AssociationEdge::ManyToOne { storage_name, .. } => {
            // Write the child first, then point the parent's foreign key
            // column at the new id.
            let repository_child = repository(store, &child.definition)?;
            let result = execute_write_operation(&*repository_child, payload, verb).await?;
            let id = written_id(&result, &child.definition)?;

            let foreign_key = parent
                .definition
                .field_by_storage_name(storage_name)
                .ok_or_else(|| {
                    ApiError::Unsupported(format!(
                        "entity {} has no column {}",
                        parent.definition.entity_name, storage_name
                    ))
                })?;

            let mut link = Payload::new();
            link.insert("id".to_string(), Value::String(parent_id));
            link.insert(
                foreign_key.property_name.clone(),
                Value::String(id.clone()),
            );

            let repository_parent = repository(store, &parent.definition)?;
            repository_parent.update(vec![link]).await?;

            Ok(WriteOutcome {
                definition: child.definition.clone(),
                id,
            })
        }
        AssociationEdge::ManyToMany { .. } => {
            // Write the reference entity, then upsert the junction link by
            // updating the parent with a relation payload. The link tuple is
            // the only field besides the id.
            let repository_reference = repository(store, &child.definition)?;
            let result = execute_write_operation(&*repository_reference, payload, verb).await?;
            let id = written_id(&result, &child.definition)?;

            let mut link = Payload::new();
            link.insert("id".to_string(), Value::String(parent_id));
            link.insert(
                child.entity.clone(),
                Value::Array(vec![serde_json::json!({ "id": id })]),
            );

            let repository_parent = repository(store, &parent.definition)?;
            repository_parent.update(vec![link]).await?;

            Ok(WriteOutcome {
                definition: child.definition.clone(),
                id,
            })
        }
    }
}

async fn do_delete<S: Store>(
    store: &S,
    definition: &EntityDefinition,
    primary_key: Payload,
) -> Result<(), ApiError> {
    let repository = repository(store, definition)?;
    let described = Value::Object(primary_key.clone()).to_string();
    let result = repository.delete(vec![primary_key]).await?;

    if result.errors.is_empty() {
        return Ok(());
    }
    Err(ApiError::ResourceNotFound {
        entity: definition.entity_name.clone(),
        primary_key: described,
    })
}

/// DELETE: root and to-one/to-many children by `{id}`, many-to-many by the
/// junction composite key, translations by `{reference, language}`.
pub async fn delete<S: Store>(
    store: &S,
    registry: &DefinitionRegistry,
    segments: &[PathSegment],
) -> Result<(Arc<EntityDefinition>, Id), ApiError> {
    let last = segments.last().expect("segment chain is never empty");
    let id = last.value.clone().ok_or_else(|| {
        ApiError::BadRequest("Delete requires an identifier.".to_string())
    })?;

    let mut by_id = Payload::new();
    by_id.insert("id".to_string(), Value::String(id.clone()));

    if segments.len() == 1 {
        do_delete(store, &segments[0].definition, by_id).await?;
        return Ok((segments[0].definition.clone(), id));
    }

    let (child, parent) = last_and_parent(segments);
    let edge = child
        .edge
        .as_ref()
        .ok_or_else(|| ApiError::Unsupported("non-root segment without an edge".to_string()))?;

    match edge {
        AssociationEdge::ManyToOne { .. } | AssociationEdge::OneToMany { .. } => {
            do_delete(store, &child.definition, by_id).await?;
        }
        AssociationEdge::ManyToMany {
            mapping_entity,
            mapping_local_column,
            mapping_reference_column,
            ..
        } => {
            // Never a synthetic single id: the junction row is keyed by both
            // mapping columns.
            let parent_id = parent_id(parent)?;
            let (mapping_name, keys) = junction_delete_keys(
                registry,
                mapping_entity,
                mapping_local_column,
                mapping_reference_column,
                &parent_id,
                &id,
            )?;
            let mapping = registry.get(&mapping_name).ok_or_else(|| {
                ApiError::Unsupported(format!("unregistered junction {mapping_name}"))
            })?;
            do_delete(store, &mapping, keys).await?;
        }
        AssociationEdge::TranslationSet {
            reference_field,
            language_field,
            ..
        } => {
            let parent_id = parent_id(parent)?;
            let keys = translation_delete_keys(
                &child.definition,
                reference_field,
                language_field,
                &parent_id,
                &id,
            )?;
            do_delete(store, &child.definition, keys).await?;
        }
    }

    Ok((child.definition.clone(), id))
}

/// POST /_action/clone/{entity}/{id}: duplicate one top-level entity and
/// report the id of the copy.
pub async fn clone_entity<S: Store>(
    store: &S,
    registry: &DefinitionRegistry,
    entity: &str,
    id: &Id,
) -> Result<Id, ApiError> {
    let entity_name = entity.replace('-', "_");
    let definition = registry
        .get(&entity_name)
        .ok_or_else(|| ApiError::DefinitionNotFound {
            entity: entity_name.clone(),
        })?;

    let repository = repository(store, &definition)?;
    let result = repository.clone_entity(id).await?;

    result
        .event_for(&definition.entity_name)
        .and_then(|event| event.ids.first().cloned())
        .ok_or_else(|| ApiError::NoEntityCloned {
            entity: entity_name,
            id: id.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::resolve::resolve;
    use crate::model::Filter;
    use crate::seed::{demo_registry, demo_store};
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn one_to_many_create_injects_the_parent_foreign_key() {
        let registry = demo_registry();
        let store = demo_store(&registry);
        let segments = resolve(&registry, "product", "P1/unit-prices").unwrap();

        let outcome = write(
            &store,
            &segments,
            WriteVerb::Create,
            payload(json!({"price": 12})),
        )
        .await
        .unwrap();

        assert_eq!(outcome.definition.entity_name, "product_price");
        let repo = store.repository("product_price").unwrap();
        let rows = repo.read(std::slice::from_ref(&outcome.id)).await.unwrap();
        assert_eq!(rows[0]["productId"], json!("P1"));
    }

    #[tokio::test]
    async fn many_to_many_create_links_without_touching_other_parent_fields() {
        let registry = demo_registry();
        let store = demo_store(&registry);
        let product_repo = store.repository("product").unwrap();
        let before = product_repo
            .read(std::slice::from_ref(&"P1".to_string()))
            .await
            .unwrap();

        let segments = resolve(&registry, "product", "P1/categories").unwrap();
        let outcome = write(
            &store,
            &segments,
            WriteVerb::Create,
            payload(json!({"name": "garden"})),
        )
        .await
        .unwrap();
        assert_eq!(outcome.definition.entity_name, "category");

        // The junction row exists and is keyed by both sides.
        let mapping_repo = store.repository("product_category").unwrap();
        let mut criteria = Criteria::new();
        criteria.add_filter(Filter::equals("categoryId", outcome.id.clone()));
        let links = mapping_repo.search(&criteria).await.unwrap();
        assert_eq!(links.total, 1);
        assert_eq!(links.rows[0]["productId"], json!("P1"));

        // The parent row itself is unchanged.
        let after = product_repo
            .read(std::slice::from_ref(&"P1".to_string()))
            .await
            .unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn many_to_one_create_repoints_the_parent_foreign_key() {
        let registry = demo_registry();
        let store = demo_store(&registry);
        let segments = resolve(&registry, "product", "P1/manufacturer").unwrap();

        let outcome = write(
            &store,
            &segments,
            WriteVerb::Create,
            payload(json!({"name": "Acme Forge"})),
        )
        .await
        .unwrap();
        assert_eq!(outcome.definition.entity_name, "product_manufacturer");

        let product_repo = store.repository("product").unwrap();
        let rows = product_repo
            .read(std::slice::from_ref(&"P1".to_string()))
            .await
            .unwrap();
        assert_eq!(rows[0]["manufacturerId"], json!(outcome.id));
    }

    #[tokio::test]
    async fn create_with_identifier_on_path_is_method_not_allowed() {
        let registry = demo_registry();
        let store = demo_store(&registry);
        let segments = resolve(&registry, "product", "P1").unwrap();

        let err = write(
            &store,
            &segments,
            WriteVerb::Create,
            payload(json!({"name": "x"})),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::MethodNotAllowed { .. }));
    }

    #[tokio::test]
    async fn bulk_payload_is_rejected() {
        let registry = demo_registry();
        let store = demo_store(&registry);
        let segments = resolve(&registry, "product", "").unwrap();

        let err = write(
            &store,
            &segments,
            WriteVerb::Create,
            payload(json!({"0": {"name": "a"}, "1": {"name": "b"}})),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn root_update_injects_the_path_identifier() {
        let registry = demo_registry();
        let store = demo_store(&registry);
        let segments = resolve(&registry, "product", "P1").unwrap();

        write(
            &store,
            &segments,
            WriteVerb::Update,
            payload(json!({"name": "Sledgehammer"})),
        )
        .await
        .unwrap();

        let repo = store.repository("product").unwrap();
        let rows = repo.read(std::slice::from_ref(&"P1".to_string())).await.unwrap();
        assert_eq!(rows[0]["name"], json!("Sledgehammer"));
    }

    #[tokio::test]
    async fn many_to_many_delete_removes_the_junction_row_only() {
        let registry = demo_registry();
        let store = demo_store(&registry);
        let segments = resolve(&registry, "product", "P1/categories/C1").unwrap();

        let (definition, id) = delete(&store, &registry, &segments).await.unwrap();
        assert_eq!(definition.entity_name, "category");
        assert_eq!(id, "C1");

        let mapping_repo = store.repository("product_category").unwrap();
        let links = mapping_repo.search(&Criteria::new()).await.unwrap();
        assert!(links.rows.iter().all(|link| {
            link["productId"] != json!("P1") || link["categoryId"] != json!("C1")
        }));

        // Both endpoint rows survive.
        let category_repo = store.repository("category").unwrap();
        assert_eq!(
            category_repo
                .read(std::slice::from_ref(&"C1".to_string()))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn translation_delete_uses_the_composite_key() {
        let registry = demo_registry();
        let store = demo_store(&registry);
        let segments = resolve(&registry, "product", "P1/translations/L1").unwrap();

        delete(&store, &registry, &segments).await.unwrap();

        let repo = store.repository("product_translation").unwrap();
        let mut criteria = Criteria::new();
        criteria.add_filter(Filter::equals("productId", "P1"));
        let remaining = repo.search(&criteria).await.unwrap();
        assert!(remaining
            .rows
            .iter()
            .all(|row| row["languageId"] != json!("L1")));
    }

    #[tokio::test]
    async fn detail_of_missing_row_is_resource_not_found() {
        let registry = demo_registry();
        let store = demo_store(&registry);
        let segments = resolve(&registry, "product", "missing").unwrap();

        let err = fetch_detail(&store, &segments).await.unwrap_err();
        assert!(matches!(err, ApiError::ResourceNotFound { .. }));
    }

    #[tokio::test]
    async fn nested_listing_requires_a_parent_identifier() {
        let registry = demo_registry();
        let store = demo_store(&registry);
        let segments = resolve(&registry, "product", "categories").unwrap();

        let err = fetch_listing(&store, &segments, Criteria::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn many_to_one_listing_filters_via_the_reverse_edge() {
        let registry = demo_registry();
        let store = demo_store(&registry);
        let segments = resolve(&registry, "product", "P1/manufacturer").unwrap();

        let (definition, result) = fetch_listing(&store, &segments, Criteria::new())
            .await
            .unwrap();
        assert_eq!(definition.entity_name, "product_manufacturer");
        assert_eq!(result.total, 1);
        assert_eq!(result.rows[0]["id"], json!("M1"));
    }

    #[tokio::test]
    async fn clone_returns_the_new_identifier() {
        let registry = demo_registry();
        let store = demo_store(&registry);

        let new_id = clone_entity(&store, &registry, "product", &"P1".to_string())
            .await
            .unwrap();
        assert_ne!(new_id, "P1");

        let err = clone_entity(&store, &registry, "product", &"missing".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NoEntityCloned { .. }));
    }
}
