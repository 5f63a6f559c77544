use crate::model::{Criteria, DeleteResult, EntityRow, Id, Payload, SearchResult, WrittenResult};
use anyhow::Result;
use std::sync::Arc;

/// Storage primitives for one entity. The API core treats this as a black
/// box that may be remote or latent; it never wraps multi-call sequences in
/// a transaction.
#[async_trait::async_trait]
pub trait Repository: Send + Sync {
    async fn search(&self, criteria: &Criteria) -> Result<SearchResult>;
    async fn read(&self, ids: &[Id]) -> Result<Vec<EntityRow>>;
    async fn create(&self, payloads: Vec<Payload>) -> Result<WrittenResult>;
    async fn update(&self, payloads: Vec<Payload>) -> Result<WrittenResult>;
    /// Delete by primary-key maps; composite keys (junction rows,
    /// translations) are passed as multi-entry maps.
    async fn delete(&self, primary_keys: Vec<Payload>) -> Result<DeleteResult>;
    async fn clone_entity(&self, id: &Id) -> Result<WrittenResult>;
}

pub trait Store: Send + Sync {
    fn repository(&self, entity: &str) -> Option<Arc<dyn Repository>>;
}
