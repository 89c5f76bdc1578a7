use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use uuid::Uuid;

use crate::domain::{ports::VectorStore, DocumentChunk, DomainError, Embedding, SearchResult};

/// A chunk with its vector, keyed by an index-assigned id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: Uuid,
    pub chunk: DocumentChunk,
    pub embedding: Embedding,
}

/// Brute-force cosine index held in memory.
pub struct InMemoryVectorStore {
    records: RwLock<Vec<EmbeddingRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::from_records(Vec::new())
    }

    pub fn from_records(records: Vec<EmbeddingRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn records(&self) -> Result<Vec<EmbeddingRecord>, DomainError> {
        self.records
            .read()
            .map(|r| r.clone())
            .map_err(|e| DomainError::internal(e.to_string()))
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(
        &self,
        chunk: &DocumentChunk,
        embedding: &Embedding,
    ) -> Result<(), DomainError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        records.retain(|r| r.chunk.id != chunk.id);
        records.push(EmbeddingRecord {
            id: Uuid::new_v4(),
            chunk: chunk.clone(),
            embedding: embedding.clone(),
        });
        Ok(())
    }

    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let records = self
            .records
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let mut results: Vec<SearchResult> = records
            .iter()
            .map(|r| SearchResult {
                chunk: r.chunk.clone(),
                score: query.cosine_similarity(&r.embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        Ok(results)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        self.records
            .read()
            .map(|r| r.len())
            .map_err(|e| DomainError::internal(e.to_string()))
    }

    async fn persist(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
