//! Application layer - Use cases and orchestration.
//!
//! Services here compose domain ports (traits) into the ingestion pipeline,
//! the conversational pipeline and per-user sessions. They never name a
//! concrete adapter.

pub mod services;

pub use services::{
    CompletedAnswer, ConversationalPipeline, DocumentService, IngestOutcome, PendingAnswer,
    RagService, Session, SessionHandle, SessionRegistry, SessionServices, SessionSnapshot,
    UploadOutcome,
};
