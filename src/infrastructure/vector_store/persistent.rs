use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;

use super::in_memory::{EmbeddingRecord, InMemoryVectorStore};
use crate::domain::{ports::VectorStore, DocumentChunk, DomainError, Embedding, SearchResult};

const INDEX_FILE: &str = "index.json";
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    records: Vec<EmbeddingRecord>,
}

/// In-memory index mirrored to `<dir>/index.json` on [`VectorStore::persist`].
///
/// Each persist writes a private temp file and renames it into place, so
/// concurrent writers never interleave; the last rename wins.
pub struct PersistentVectorStore {
    dir: PathBuf,
    inner: InMemoryVectorStore,
}

impl PersistentVectorStore {
    /// Loads existing records from `dir`, or starts empty.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let dir = dir.into();
        let path = dir.join(INDEX_FILE);

        let records = match tokio::fs::read(&path).await {
            Ok(raw) => {
                let file: IndexFile = serde_json::from_slice(&raw).map_err(|e| {
                    DomainError::storage(format!("corrupt index {}: {e}", path.display()))
                })?;
                if file.version != FORMAT_VERSION {
                    return Err(DomainError::storage(format!(
                        "unsupported index version {} in {}",
                        file.version,
                        path.display()
                    )));
                }
                file.records
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(DomainError::storage(format!("read {}: {e}", path.display())))
            }
        };

        tracing::debug!(dir = %dir.display(), records = records.len(), "index opened");
        Ok(Self {
            dir,
            inner: InMemoryVectorStore::from_records(records),
        })
    }
}

#[async_trait]
impl VectorStore for PersistentVectorStore {
    async fn upsert(
        &self,
        chunk: &DocumentChunk,
        embedding: &Embedding,
    ) -> Result<(), DomainError> {
        self.inner.upsert(chunk, embedding).await
    }

    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        self.inner.search(query, top_k).await
    }

    async fn count(&self) -> Result<usize, DomainError> {
        self.inner.count().await
    }

    async fn persist(&self) -> Result<(), DomainError> {
        let file = IndexFile {
            version: FORMAT_VERSION,
            records: self.inner.records()?,
        };
        let raw = serde_json::to_vec(&file)
            .map_err(|e| DomainError::internal(format!("serialize index: {e}")))?;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            DomainError::storage(format!("create {}: {e}", self.dir.display()))
        })?;

        let path = self.dir.join(INDEX_FILE);
        let dir = self.dir.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), DomainError> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)
                .map_err(|e| DomainError::storage(format!("temp file in {}: {e}", dir.display())))?;
            tmp.write_all(&raw)
                .map_err(|e| DomainError::storage(format!("write {}: {e}", tmp.path().display())))?;
            tmp.persist(&target)
                .map_err(|e| DomainError::storage(format!("rename {}: {e}", target.display())))?;
            Ok(())
        })
        .await
        .map_err(|e| DomainError::internal(format!("index writer crashed: {e}")))??;

        tracing::info!(path = %path.display(), records = file.records.len(), "index persisted");
        Ok(())
    }
}
