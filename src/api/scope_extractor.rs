use crate::api::error::ApiError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

const SCOPES_HEADER: &str = "x-access-scopes";
const WRITE_SCOPE: &str = "write";

/// Axum extractor gating write endpoints on the caller's access scopes.
///
/// Scopes arrive as a comma separated list in the `x-access-scopes` header
/// (set by the authentication layer in front of this core). Extraction fails
/// with `AccessDenied` when the write scope is missing.
pub struct WriteScope;

#[async_trait]
impl<S> FromRequestParts<S> for WriteScope
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if has_scope(&parts.headers, WRITE_SCOPE) {
            Ok(Self)
        } else {
            Err(ApiError::AccessDenied(
                "You don't have write access using this access key.".to_string(),
            ))
        }
    }
}

fn has_scope(headers: &HeaderMap, scope: &str) -> bool {
    headers
        .get(SCOPES_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(',').any(|entry| entry.trim() == scope))
        .unwrap_or(false)
}
