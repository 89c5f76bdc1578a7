mod conversation;
mod document;
mod rag;
mod registry;
mod session;

pub use conversation::{ConversationalPipeline, SharedMemory};
pub use document::{DocumentService, IngestOutcome};
pub use rag::RagService;
pub use registry::{SessionHandle, SessionRegistry};
pub use session::{
    CompletedAnswer, PendingAnswer, Session, SessionServices, SessionSnapshot, UploadOutcome,
};
