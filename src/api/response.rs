use crate::model::{EntityRow, Id, SearchResult};
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub items: Vec<EntityRow>,
    pub total: usize,
}

pub fn create_detail_response(row: EntityRow) -> Response {
    Json(row).into_response()
}

pub fn create_listing_response(result: SearchResult) -> Response {
    Json(ListResponse {
        items: result.rows,
        total: result.total,
    })
    .into_response()
}

/// Writes without `_response` answer 204 and point at the affected resource.
pub fn create_redirect_response(entity: &str, id: &Id) -> Response {
    (
        StatusCode::NO_CONTENT,
        [(header::LOCATION, format!("/api/{entity}/{id}"))],
    )
        .into_response()
}
