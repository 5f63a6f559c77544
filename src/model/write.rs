use crate::model::{Id, Payload};
use serde::{Deserialize, Serialize};

/// The two write operations every payload funnels through. A closed enum:
/// there is no "other verb" branch for the dispatcher to fall through to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteVerb {
    Create,
    Update,
}

/// Outcome of a repository write: per affected entity definition, the
/// primary-key identifiers touched and any validation errors. Read-only
/// once returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WrittenResult {
    pub events: Vec<WrittenEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrittenEvent {
    pub entity: String,
    pub ids: Vec<Id>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
}

impl WrittenResult {
    pub fn single(entity: impl Into<String>, ids: Vec<Id>) -> Self {
        Self {
            events: vec![WrittenEvent {
                entity: entity.into(),
                ids,
                errors: Vec::new(),
            }],
        }
    }

    pub fn event_for(&self, entity: &str) -> Option<&WrittenEvent> {
        self.events.iter().find(|event| event.entity == entity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteResult {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
}

/// One raw entity row as handed back by the repository, keyed by property
/// names.
pub type EntityRow = Payload;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub rows: Vec<EntityRow>,
    pub total: usize,
}
