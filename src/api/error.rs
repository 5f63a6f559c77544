use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

/// Typed failure taxonomy for the API core. Every error is surfaced to the
/// caller immediately; nothing is retried internally.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("The requested entity does not exist.")]
    DefinitionNotFound { entity: String },

    #[error("Resource at path \"{path}\" is not an existing relation.")]
    PathNotFound { path: String },

    #[error("The {entity} resource with the primary key {primary_key} was not found.")]
    ResourceNotFound { entity: String, primary_key: String },

    #[error("No repository registered for entity \"{entity}\".")]
    RepositoryNotFound { entity: String },

    #[error("Could not clone entity {entity} with id {id}.")]
    NoEntityCloned { entity: String, id: String },

    #[error("{0}")]
    BadRequest(String),

    #[error("The Content-Type \"{content_type}\" is unsupported.")]
    UnsupportedMediaType { content_type: String },

    #[error("Method Not Allowed (Allow: {allowed})")]
    MethodNotAllowed { allowed: String },

    #[error("{0}")]
    AccessDenied(String),

    /// Programmer error: an association kind reached a code path with no
    /// defined behavior. Never expected in normal operation.
    #[error("{0}")]
    Unsupported(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DefinitionNotFound { .. }
            | Self::PathNotFound { .. }
            | Self::ResourceNotFound { .. }
            | Self::RepositoryNotFound { .. }
            | Self::NoEntityCloned { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::AccessDenied(_) => StatusCode::FORBIDDEN,
            Self::Unsupported(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("internal error: {self}");
        }

        if let Self::MethodNotAllowed { allowed } = &self {
            return (
                status,
                [(header::ALLOW, allowed.clone())],
                Json(ErrorResponse::new(&self.to_string())),
            )
                .into_response();
        }

        (status, Json(ErrorResponse::new(&self.to_string()))).into_response()
    }
}
