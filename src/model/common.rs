use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Id = String;

/// Canonical key/value payload shape used for request bodies and
/// repository writes. Keys are property names, not storage names.
pub type Payload = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DataType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}
