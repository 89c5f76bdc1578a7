mod document_store;
mod embedding;
mod llm;
mod text_extractor;
mod vector_store;

pub use document_store::DocumentStore;
pub use embedding::EmbeddingService;
pub use llm::{LlmService, TextStream};
pub use text_extractor::TextExtractor;
pub use vector_store::{VectorStore, VectorStoreFactory};
