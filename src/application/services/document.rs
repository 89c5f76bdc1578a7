use std::sync::Arc;
use tracing::instrument;

use crate::domain::{
    chunk_content,
    ports::{DocumentStore, TextExtractor},
    ChunkingPolicy, DedupPolicy, DocumentChunk, DomainError, UploadedDocument,
};

/// Result of handing an upload to [`DocumentService::ingest`].
#[derive(Debug)]
pub enum IngestOutcome {
    /// The file was persisted, extracted and chunked.
    Stored {
        document: UploadedDocument,
        chunks: Vec<DocumentChunk>,
    },
    /// A file with the same storage name already exists; nothing was written.
    AlreadyPresent { storage_name: String },
}

/// Document Store + Chunker half of the ingestion pipeline.
pub struct DocumentService {
    store: Arc<dyn DocumentStore>,
    extractor: Arc<dyn TextExtractor>,
    chunking: ChunkingPolicy,
    dedup: DedupPolicy,
}

impl DocumentService {
    pub fn new(store: Arc<dyn DocumentStore>, extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            store,
            extractor,
            chunking: ChunkingPolicy::default(),
            dedup: DedupPolicy::default(),
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkingPolicy) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn dedup(&self) -> DedupPolicy {
        self.dedup
    }

    /// Persists the upload, then extracts and chunks its text.
    ///
    /// The file is written before extraction, so a document that fails to
    /// parse stays on disk and later uploads of it are skipped.
    #[instrument(skip(self, document), fields(filename = %document.filename, bytes = document.bytes.len()))]
    pub async fn ingest(&self, document: UploadedDocument) -> Result<IngestOutcome, DomainError> {
        let storage_name = document.storage_name(self.dedup);

        if self.store.exists(&storage_name).await? {
            tracing::info!(storage_name, "document already stored, skipping ingestion");
            return Ok(IngestOutcome::AlreadyPresent { storage_name });
        }

        let path = self.store.save(&storage_name, &document.bytes).await?;
        let document = document.with_path(path);

        let extractor = self.extractor.clone();
        let (document, extracted) = tokio::task::spawn_blocking(move || {
            let extracted = extractor.extract(&document.bytes);
            (document, extracted)
        })
        .await
        .map_err(|e| DomainError::extraction(format!("extractor crashed: {e}")))?;
        let text = extracted?;
        let chunks = chunk_content(document.id, &storage_name, &text, &self.chunking);
        tracing::info!(
            storage_name,
            chars = text.chars().count(),
            chunks = chunks.len(),
            "document chunked"
        );

        Ok(IngestOutcome::Stored { document, chunks })
    }

    pub async fn is_stored(&self, storage_name: &str) -> Result<bool, DomainError> {
        self.store.exists(storage_name).await
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<String>, DomainError> {
        self.store.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        files: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl DocumentStore for MemoryStore {
        async fn exists(&self, name: &str) -> Result<bool, DomainError> {
            Ok(self.files.lock().unwrap().iter().any(|(n, _)| n == name))
        }

        async fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, DomainError> {
            self.files
                .lock()
                .unwrap()
                .push((name.to_string(), bytes.to_vec()));
            Ok(PathBuf::from(name))
        }

        async fn list(&self) -> Result<Vec<String>, DomainError> {
            Ok(self
                .files
                .lock()
                .unwrap()
                .iter()
                .map(|(n, _)| n.clone())
                .collect())
        }
    }

    struct Utf8Extractor;

    impl TextExtractor for Utf8Extractor {
        fn extract(&self, bytes: &[u8]) -> Result<String, DomainError> {
            String::from_utf8(bytes.to_vec()).map_err(|e| DomainError::extraction(e.to_string()))
        }
    }

    struct PanickingExtractor;

    impl TextExtractor for PanickingExtractor {
        fn extract(&self, _bytes: &[u8]) -> Result<String, DomainError> {
            panic!("malformed object stream");
        }
    }

    fn service(store: Arc<MemoryStore>) -> DocumentService {
        DocumentService::new(store, Arc::new(Utf8Extractor))
    }

    #[tokio::test]
    async fn test_ingest_stores_and_chunks() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(store.clone());

        let outcome = svc
            .ingest(UploadedDocument::new("sky.pdf", b"The sky is blue.".to_vec()))
            .await
            .unwrap();

        match outcome {
            IngestOutcome::Stored { document, chunks } => {
                assert_eq!(document.path, Some(PathBuf::from("sky.pdf")));
                assert_eq!(chunks.len(), 1);
                assert_eq!(chunks[0].source, "sky.pdf");
                assert_eq!(chunks[0].document_id, document.id);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(svc.list().await.unwrap(), vec!["sky.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_reupload_same_filename_is_skipped() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(store.clone());

        svc.ingest(UploadedDocument::new("a.pdf", b"first".to_vec()))
            .await
            .unwrap();
        let outcome = svc
            .ingest(UploadedDocument::new("a.pdf", b"second".to_vec()))
            .await
            .unwrap();

        assert!(matches!(outcome, IngestOutcome::AlreadyPresent { .. }));
        assert_eq!(store.files.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_content_hash_dedup_ingests_changed_file() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(store.clone()).with_dedup(DedupPolicy::ContentHash);

        svc.ingest(UploadedDocument::new("a.pdf", b"first".to_vec()))
            .await
            .unwrap();
        let changed = svc
            .ingest(UploadedDocument::new("a.pdf", b"second".to_vec()))
            .await
            .unwrap();
        let repeated = svc
            .ingest(UploadedDocument::new("b.pdf", b"second".to_vec()))
            .await
            .unwrap();

        assert!(matches!(changed, IngestOutcome::Stored { .. }));
        assert!(matches!(repeated, IngestOutcome::AlreadyPresent { .. }));
    }

    #[tokio::test]
    async fn test_extraction_failure_keeps_stored_file() {
        let store = Arc::new(MemoryStore::default());
        let svc = service(store.clone());

        let err = svc
            .ingest(UploadedDocument::new("bad.pdf", vec![0xff, 0xfe]))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Extraction(_)));
        assert_eq!(store.files.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_extractor_panic_is_extraction_error() {
        let store = Arc::new(MemoryStore::default());
        let svc = DocumentService::new(store.clone(), Arc::new(PanickingExtractor));

        let err = svc
            .ingest(UploadedDocument::new("crash.pdf", b"%PDF-1.7".to_vec()))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Extraction(_)));
        assert_eq!(store.files.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_document_yields_no_chunks() {
        let svc = service(Arc::new(MemoryStore::default()));

        let outcome = svc
            .ingest(UploadedDocument::new("empty.pdf", Vec::new()))
            .await
            .unwrap();

        match outcome {
            IngestOutcome::Stored { chunks, .. } => assert!(chunks.is_empty()),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
