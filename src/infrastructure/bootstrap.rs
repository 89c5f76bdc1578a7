use std::sync::Arc;

use crate::application::{DocumentService, SessionServices};
use crate::domain::{ports::VectorStoreFactory, DomainError};
use crate::infrastructure::{
    AppConfig, FsDocumentStore, InMemoryIndexFactory, OllamaEmbedding, OllamaLlm,
    PdfTextExtractor, PersistentIndexFactory,
};

/// Wires the Ollama, filesystem and index adapters described by `config`.
pub fn session_services(config: &AppConfig) -> Result<SessionServices, DomainError> {
    let cfg = &config.config;

    let documents = DocumentService::new(
        Arc::new(FsDocumentStore::new(&cfg.storage.content_dir)),
        Arc::new(PdfTextExtractor::new()),
    )
    .with_chunking(cfg.chunking.policy()?)
    .with_dedup(cfg.ingest.dedup);

    let index_factory: Arc<dyn VectorStoreFactory> = match &cfg.storage.index_dir {
        Some(dir) => Arc::new(PersistentIndexFactory::new(dir)),
        None => Arc::new(InMemoryIndexFactory),
    };

    tracing::info!(
        llm = %cfg.llm.model,
        embedding = %cfg.embedding.model,
        base_url = %cfg.llm.base_url,
        content_dir = %cfg.storage.content_dir.display(),
        index_dir = ?cfg.storage.index_dir,
        "session services configured"
    );

    Ok(SessionServices {
        documents: Arc::new(documents),
        embedding: Arc::new(OllamaEmbedding::from_config(&cfg.embedding)?),
        llm: Arc::new(OllamaLlm::from_config(&cfg.llm)?),
        index_factory,
        template: config.prompts.chat.template.clone(),
        top_k: cfg.rag.top_k,
    })
}
