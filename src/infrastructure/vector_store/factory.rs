use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::{InMemoryVectorStore, PersistentVectorStore};
use crate::domain::{
    ports::{VectorStore, VectorStoreFactory},
    DomainError,
};

/// Every handle reads the current contents of one index directory.
pub struct PersistentIndexFactory {
    dir: PathBuf,
}

impl PersistentIndexFactory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl VectorStoreFactory for PersistentIndexFactory {
    async fn open(&self) -> Result<Arc<dyn VectorStore>, DomainError> {
        Ok(Arc::new(PersistentVectorStore::open(&self.dir).await?))
    }
}

/// Every handle starts empty.
#[derive(Default)]
pub struct InMemoryIndexFactory;

#[async_trait]
impl VectorStoreFactory for InMemoryIndexFactory {
    async fn open(&self) -> Result<Arc<dyn VectorStore>, DomainError> {
        Ok(Arc::new(InMemoryVectorStore::new()))
    }
}
