pub mod bootstrap;
pub mod config;
pub mod document_store;
pub mod embedding;
pub mod extract;
pub mod llm;
pub mod telemetry;
pub mod vector_store;

pub use bootstrap::session_services;
pub use config::{AppConfig, Config, PromptsConfig};
pub use document_store::FsDocumentStore;
pub use embedding::OllamaEmbedding;
pub use extract::PdfTextExtractor;
pub use llm::OllamaLlm;
pub use telemetry::init_tracing;
pub use vector_store::{
    InMemoryIndexFactory, InMemoryVectorStore, PersistentIndexFactory, PersistentVectorStore,
};
