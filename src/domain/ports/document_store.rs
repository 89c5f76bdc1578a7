use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::errors::DomainError;

/// Raw uploaded files, keyed by their storage name.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn exists(&self, name: &str) -> Result<bool, DomainError>;
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, DomainError>;
    async fn list(&self) -> Result<Vec<String>, DomainError>;
}
