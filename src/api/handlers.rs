use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::{Json, Response},
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::body::decode_body;
use crate::api::error::ApiError;
use crate::api::response::{
    create_detail_response, create_listing_response, create_redirect_response,
};
use crate::api::scope_extractor::WriteScope;
use crate::logic::{dispatch, resolve::resolve};
use crate::model::{Criteria, DefinitionRegistry, Id, WriteVerb};
use crate::store::traits::Store;

/// Shared per-request context: the immutable schema registry plus the store
/// behind the repository seam. Cheap to clone, never mutated.
pub struct AppState<S> {
    pub registry: Arc<DefinitionRegistry>,
    pub store: Arc<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            store: self.store.clone(),
        }
    }
}

impl<S> AppState<S> {
    pub fn new(registry: Arc<DefinitionRegistry>, store: Arc<S>) -> Self {
        Self { registry, store }
    }
}

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// GET /api/{entity} — root collection listing.
pub async fn list_root<S: Store>(
    State(state): State<AppState<S>>,
    Path(entity): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let segments = resolve(&state.registry, &entity, "")?;
    let criteria = Criteria::from_query(&params);
    let (_, result) = dispatch::fetch_listing(&*state.store, &segments, criteria).await?;
    Ok(create_listing_response(result))
}

/// GET /api/{entity}/... — detail when the resolved chain ends in an
/// identifier, nested collection listing otherwise.
pub async fn get_path<S: Store>(
    State(state): State<AppState<S>>,
    Path((entity, path)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let segments = resolve(&state.registry, &entity, &path)?;

    if segments.last().is_some_and(|last| last.value.is_some()) {
        let (_, row) = dispatch::fetch_detail(&*state.store, &segments).await?;
        return Ok(create_detail_response(row));
    }

    let criteria = Criteria::from_query(&params);
    let (_, result) = dispatch::fetch_listing(&*state.store, &segments, criteria).await?;
    Ok(create_listing_response(result))
}

/// POST /api/{entity} — root create.
pub async fn create_root<S: Store>(
    State(state): State<AppState<S>>,
    Path(entity): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    _scope: WriteScope,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    handle_write(&state, &entity, "", WriteVerb::Create, &params, &headers, &body).await
}

/// POST /api/{entity}/... — nested create.
pub async fn create_path<S: Store>(
    State(state): State<AppState<S>>,
    Path((entity, path)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    _scope: WriteScope,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    handle_write(
        &state,
        &entity,
        &path,
        WriteVerb::Create,
        &params,
        &headers,
        &body,
    )
    .await
}

/// PATCH /api/{entity}/... — update; the trailing path identifier is
/// injected into the payload as `id`.
pub async fn update_path<S: Store>(
    State(state): State<AppState<S>>,
    Path((entity, path)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    _scope: WriteScope,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    handle_write(
        &state,
        &entity,
        &path,
        WriteVerb::Update,
        &params,
        &headers,
        &body,
    )
    .await
}

/// DELETE /api/{entity}/...
pub async fn delete_path<S: Store>(
    State(state): State<AppState<S>>,
    Path((entity, path)): Path<(String, String)>,
    _scope: WriteScope,
) -> Result<Response, ApiError> {
    let segments = resolve(&state.registry, &entity, &path)?;
    let (definition, id) = dispatch::delete(&*state.store, &state.registry, &segments).await?;
    Ok(create_redirect_response(&definition.entity_name, &id))
}

#[derive(Debug, Serialize)]
pub struct CloneResponse {
    pub id: Id,
}

/// POST /api/_action/clone/{entity}/{id} — duplicate one top-level entity.
pub async fn clone_entity<S: Store>(
    State(state): State<AppState<S>>,
    Path((entity, id)): Path<(String, Id)>,
    _scope: WriteScope,
) -> Result<Json<CloneResponse>, ApiError> {
    let new_id = dispatch::clone_entity(&*state.store, &state.registry, &entity, &id).await?;
    Ok(Json(CloneResponse { id: new_id }))
}

async fn handle_write<S: Store>(
    state: &AppState<S>,
    entity: &str,
    path: &str,
    verb: WriteVerb,
    params: &HashMap<String, String>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let payload = decode_body(content_type, body)?;

    let segments = resolve(&state.registry, entity, path)?;
    let outcome = dispatch::write(&*state.store, &segments, verb, payload).await?;

    // Default is a contentless redirect; `_response` asks for the full
    // detail body of the written row.
    if !params.contains_key("_response") {
        return Ok(create_redirect_response(
            &outcome.definition.entity_name,
            &outcome.id,
        ));
    }

    let repository = state
        .store
        .repository(&outcome.definition.entity_name)
        .ok_or_else(|| ApiError::RepositoryNotFound {
            entity: outcome.definition.entity_name.clone(),
        })?;
    let rows = repository.read(std::slice::from_ref(&outcome.id)).await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::ResourceNotFound {
            entity: outcome.definition.entity_name.clone(),
            primary_key: format!("id={}", outcome.id),
        })?;
    Ok(create_detail_response(row))
}
