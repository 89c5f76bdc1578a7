mod conversation;
mod document;
mod embedding;
mod prompt;

pub use conversation::{Conversation, ConversationMemory, Message, MessageRole};
pub use document::{
    chunk_content, ensure_pdf, ChunkMetadata, ChunkingPolicy, DedupPolicy, DocumentChunk,
    SearchResult, UploadedDocument, PDF_CONTENT_TYPE,
};
pub use embedding::Embedding;
pub use prompt::{PromptContext, PromptTemplate, DEFAULT_TEMPLATE};
