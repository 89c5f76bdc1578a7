use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::domain::{ports::DocumentStore, DomainError};

/// Uploaded files kept as-is in a content directory.
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, DomainError> {
        let file = Path::new(name);
        let is_plain = file.components().count() == 1
            && file.file_name().map(|f| f == file.as_os_str()).unwrap_or(false);
        if !is_plain {
            return Err(DomainError::validation(format!(
                "invalid storage name: {name}"
            )));
        }
        Ok(self.root.join(file))
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn exists(&self, name: &str) -> Result<bool, DomainError> {
        let path = self.path_for(name)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, DomainError> {
        let path = self.path_for(name)?;
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            DomainError::storage(format!("create {}: {e}", self.root.display()))
        })?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| DomainError::storage(format!("write {}: {e}", path.display())))?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "document stored");
        Ok(path)
    }

    async fn list(&self) -> Result<Vec<String>, DomainError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}
