use crate::api::error::ApiError;
use crate::model::Payload;
use serde_json::Value;

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_JSON_API: &str = "application/vnd.api+json";

/// Normalize an inbound request body into the canonical key/value payload.
/// Exactly two media types are supported; media-type parameters
/// (`; charset=utf-8`) are ignored.
pub fn decode_body(content_type: Option<&str>, body: &[u8]) -> Result<Payload, ApiError> {
    let content_type = content_type
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim();

    match content_type {
        CONTENT_TYPE_JSON => {
            let value: Value = serde_json::from_slice(body)
                .map_err(|err| ApiError::BadRequest(err.to_string()))?;
            flatten_top_level(value)
        }
        CONTENT_TYPE_JSON_API => {
            let value: Value = serde_json::from_slice(body)
                .map_err(|err| ApiError::BadRequest(err.to_string()))?;
            decode_json_api(value)
        }
        other => Err(ApiError::UnsupportedMediaType {
            content_type: other.to_string(),
        }),
    }
}

/// A top-level array becomes a zero-indexed map so the caller's bulk check
/// rejects it with the dedicated message rather than a generic parse error.
fn flatten_top_level(value: Value) -> Result<Payload, ApiError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item))
            .collect()),
        _ => Err(ApiError::BadRequest(
            "Expected a JSON object payload.".to_string(),
        )),
    }
}

fn decode_json_api(value: Value) -> Result<Payload, ApiError> {
    let Value::Object(mut document) = value else {
        return Err(ApiError::BadRequest(
            "Expected a JSON:API document.".to_string(),
        ));
    };
    let data = document
        .remove("data")
        .ok_or_else(|| ApiError::BadRequest("JSON:API document has no data member.".to_string()))?;

    match data {
        Value::Array(resources) => Ok(resources
            .into_iter()
            .map(decode_json_api_resource)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .enumerate()
            .map(|(index, resource)| (index.to_string(), Value::Object(resource)))
            .collect()),
        resource => decode_json_api_resource(resource),
    }
}

/// Flatten one JSON:API resource object: `attributes` merge into the top
/// level, `id` is kept, and `relationships` collapse to `{prop: {"id": ..}}`
/// tuples (arrays for to-many data).
fn decode_json_api_resource(resource: Value) -> Result<Payload, ApiError> {
    let Value::Object(mut resource) = resource else {
        return Err(ApiError::BadRequest(
            "JSON:API data must be a resource object.".to_string(),
        ));
    };

    let mut flat = Payload::new();

    if let Some(id) = resource.remove("id") {
        flat.insert("id".to_string(), id);
    }

    if let Some(attributes) = resource.remove("attributes") {
        let Value::Object(attributes) = attributes else {
            return Err(ApiError::BadRequest(
                "JSON:API attributes must be an object.".to_string(),
            ));
        };
        flat.extend(attributes);
    }

    if let Some(relationships) = resource.remove("relationships") {
        let Value::Object(relationships) = relationships else {
            return Err(ApiError::BadRequest(
                "JSON:API relationships must be an object.".to_string(),
            ));
        };
        for (property, relationship) in relationships {
            let linkage = relationship
                .as_object()
                .and_then(|rel| rel.get("data"))
                .ok_or_else(|| {
                    ApiError::BadRequest(format!(
                        "JSON:API relationship \"{property}\" has no data member."
                    ))
                })?;
            flat.insert(property, decode_linkage(linkage)?);
        }
    }

    Ok(flat)
}

fn decode_linkage(linkage: &Value) -> Result<Value, ApiError> {
    match linkage {
        Value::Null => Ok(Value::Null),
        Value::Object(identifier) => {
            let id = identifier.get("id").cloned().ok_or_else(|| {
                ApiError::BadRequest("JSON:API resource identifier has no id.".to_string())
            })?;
            Ok(serde_json::json!({ "id": id }))
        }
        Value::Array(identifiers) => Ok(Value::Array(
            identifiers
                .iter()
                .map(decode_linkage)
                .collect::<Result<_, _>>()?,
        )),
        _ => Err(ApiError::BadRequest(
            "JSON:API relationship data must be null, an object or an array.".to_string(),
        )),
    }
}

/// Bulk detection: a payload whose top-level keys form the dense sequence
/// `0..n-1` is an array in disguise. The empty object is not a collection.
pub fn is_collection(payload: &Payload) -> bool {
    !payload.is_empty() && (0..payload.len()).all(|index| payload.contains_key(&index.to_string()))
}
