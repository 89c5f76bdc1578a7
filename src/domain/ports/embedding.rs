use crate::domain::{errors::DomainError, Embedding};
use async_trait::async_trait;

/// Text to vector. Chunks and questions must be embedded by the same model
/// for similarity scores to mean anything.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError>;
    /// One vector per input, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError>;
    fn model_name(&self) -> &str;
}
