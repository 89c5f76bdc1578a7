use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{errors::DomainError, DocumentChunk, Embedding, SearchResult};

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, chunk: &DocumentChunk, embedding: &Embedding)
        -> Result<(), DomainError>;
    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError>;
    async fn count(&self) -> Result<usize, DomainError>;
    /// Flushes records to durable storage. A no-op for volatile stores.
    async fn persist(&self) -> Result<(), DomainError>;
}

/// Opens index instances; every call returns a new handle.
#[async_trait]
pub trait VectorStoreFactory: Send + Sync {
    async fn open(&self) -> Result<Arc<dyn VectorStore>, DomainError>;
}
