//! Per-user session: the explicit context object every handler works on.

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::Serialize;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::application::services::{
    ConversationalPipeline, DocumentService, IngestOutcome, RagService, SharedMemory,
};
use crate::domain::{
    ports::{EmbeddingService, LlmService, TextStream, VectorStore, VectorStoreFactory},
    Conversation, DocumentChunk, DomainError, Message, MessageRole, PromptContext,
    PromptTemplate, SessionEvent, SessionPhase, UploadedDocument,
};

/// Process-wide collaborators shared by every session.
pub struct SessionServices {
    pub documents: Arc<DocumentService>,
    pub embedding: Arc<dyn EmbeddingService>,
    pub llm: Arc<dyn LlmService>,
    pub index_factory: Arc<dyn VectorStoreFactory>,
    pub template: PromptTemplate,
    pub top_k: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    Ingested { storage_name: String, chunks: usize },
    Skipped { storage_name: String },
}

/// An answer whose fragments have not been consumed yet.
pub struct PendingAnswer {
    pub question: String,
    pub context: PromptContext,
    pub fragments: TextStream,
}

pub struct CompletedAnswer {
    pub response: String,
    pub context: PromptContext,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub phase: &'static str,
    /// Whether a question would be accepted right now.
    pub ready: bool,
    pub documents: Vec<String>,
    pub history: Vec<Message>,
    pub memory_turns: usize,
    pub created_at: DateTime<Utc>,
}

pub struct Session {
    id: Uuid,
    services: Arc<SessionServices>,
    phase: SessionPhase,
    template: PromptTemplate,
    memory: SharedMemory,
    index: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmService>,
    pipeline: Option<ConversationalPipeline>,
    transcript: Conversation,
    documents: Vec<String>,
    created_at: DateTime<Utc>,
}

impl Session {
    /// Builds template, memory, index and model client in that order. The
    /// pipeline follows on the first transition to `Ready`.
    #[instrument(skip(services))]
    pub async fn open(id: Uuid, services: Arc<SessionServices>) -> Result<Self, DomainError> {
        let template = services.template.clone();
        let memory = SharedMemory::default();
        let index = services.index_factory.open().await?;
        let llm = services.llm.clone();

        let mut session = Self {
            id,
            services,
            phase: SessionPhase::Uninitialized,
            template,
            memory,
            index,
            llm,
            pipeline: None,
            transcript: Conversation::new(),
            documents: Vec::new(),
            created_at: Utc::now(),
        };
        session.dispatch(SessionEvent::Initialized)?;

        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn history(&self) -> &[Message] {
        &self.transcript.messages
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn index(&self) -> &Arc<dyn VectorStore> {
        &self.index
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let memory_turns = self.memory.read().map(|m| m.turns()).unwrap_or_default();
        SessionSnapshot {
            id: self.id,
            phase: self.phase.as_str(),
            ready: self.phase.is_ready(),
            documents: self.documents.clone(),
            history: self.transcript.messages.clone(),
            memory_turns,
            created_at: self.created_at,
        }
    }

    fn dispatch(&mut self, event: SessionEvent) -> Result<(), DomainError> {
        let next = self.phase.apply(event)?;
        tracing::debug!(
            session_id = %self.id,
            from = self.phase.as_str(),
            to = next.as_str(),
            ?event,
            "session transition"
        );
        self.phase = next;
        Ok(())
    }

    #[instrument(skip(self, document), fields(session_id = %self.id, filename = %document.filename))]
    pub async fn upload(&mut self, document: UploadedDocument) -> Result<UploadOutcome, DomainError> {
        let storage_name = document.storage_name(self.services.documents.dedup());

        if self.services.documents.is_stored(&storage_name).await? {
            self.dispatch(SessionEvent::UploadSkipped)?;
            self.ensure_pipeline();
            self.remember_document(&storage_name);
            return Ok(UploadOutcome::Skipped { storage_name });
        }

        self.dispatch(SessionEvent::UploadReceived)?;
        let mut guard = PhaseGuard::new(self, SessionEvent::IngestionFailed);
        let result = guard.ingest(document).await;
        match result {
            Ok(outcome) => {
                guard.complete(SessionEvent::IngestionFinished)?;
                self.ensure_pipeline();
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(error = %e, "ingestion failed");
                guard.complete(SessionEvent::IngestionFailed)?;
                Err(e)
            }
        }
    }

    async fn ingest(&mut self, document: UploadedDocument) -> Result<UploadOutcome, DomainError> {
        match self.services.documents.ingest(document).await? {
            IngestOutcome::Stored { document, chunks } => {
                let storage_name = document.storage_name(self.services.documents.dedup());
                let count = chunks.len();
                self.index_chunks(&chunks).await?;
                self.remember_document(&storage_name);
                Ok(UploadOutcome::Ingested {
                    storage_name,
                    chunks: count,
                })
            }
            IngestOutcome::AlreadyPresent { storage_name } => {
                self.remember_document(&storage_name);
                Ok(UploadOutcome::Skipped { storage_name })
            }
        }
    }

    /// Opens a fresh index, fills it and makes it the session's active index.
    async fn index_chunks(&mut self, chunks: &[DocumentChunk]) -> Result<(), DomainError> {
        let fresh = self.services.index_factory.open().await?;
        RagService::new(
            self.services.embedding.clone(),
            fresh.clone(),
            self.services.top_k,
        )
        .index_chunks(chunks)
        .await?;

        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.bind_index(fresh.clone());
        }
        self.index = fresh;
        Ok(())
    }

    fn ensure_pipeline(&mut self) {
        if self.pipeline.is_some() {
            return;
        }

        let rag = RagService::new(
            self.services.embedding.clone(),
            self.index.clone(),
            self.services.top_k,
        );
        self.pipeline = Some(ConversationalPipeline::new(
            rag,
            self.llm.clone(),
            self.template.clone(),
            self.memory.clone(),
        ));
        tracing::info!(session_id = %self.id, "conversational pipeline ready");
    }

    fn remember_document(&mut self, storage_name: &str) {
        if !self.documents.iter().any(|d| d == storage_name) {
            self.documents.push(storage_name.to_string());
        }
    }

    /// Records the user turn and starts generation.
    ///
    /// Before any document is available this reports
    /// [`DomainError::NoDocument`] without touching the pipeline or history.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn ask(&mut self, question: &str) -> Result<PendingAnswer, DomainError> {
        if matches!(
            self.phase,
            SessionPhase::Uninitialized | SessionPhase::AwaitingUpload
        ) {
            return Err(DomainError::NoDocument);
        }

        let question = question.trim();
        if question.is_empty() {
            return Err(DomainError::validation("question must not be empty"));
        }

        self.dispatch(SessionEvent::QuestionSubmitted)?;
        self.transcript.add_message(MessageRole::User, question);

        let guard = PhaseGuard::new(self, SessionEvent::AnswerFailed);
        let result = match guard.pipeline.as_ref() {
            Some(pipeline) => pipeline.stream(question).await,
            None => Err(DomainError::NoDocument),
        };
        guard.disarm();

        match result {
            Ok((context, fragments)) => Ok(PendingAnswer {
                question: question.to_string(),
                context,
                fragments,
            }),
            Err(e) => {
                self.fail_answer(&e);
                Err(e)
            }
        }
    }

    /// Commits a fully streamed response to memory and the transcript.
    pub fn finish_answer(&mut self, question: &str, response: &str) -> Result<(), DomainError> {
        let recorded = match self.pipeline.as_ref() {
            Some(pipeline) => pipeline.record(question, response),
            None => Ok(()),
        };
        if let Err(e) = recorded {
            self.fail_answer(&e);
            return Err(e);
        }
        self.transcript.add_message(MessageRole::Assistant, response);
        self.dispatch(SessionEvent::AnswerFinished)
    }

    /// Abandons the current answer; the user turn stays without a reply.
    pub fn fail_answer(&mut self, error: &DomainError) {
        tracing::error!(session_id = %self.id, error = %error, "answer failed");
        if let Err(e) = self.dispatch(SessionEvent::AnswerFailed) {
            tracing::warn!(error = %e, "answer failure outside of an answer");
        }
    }

    /// Runs a question to completion, consuming every fragment.
    pub async fn answer(&mut self, question: &str) -> Result<CompletedAnswer, DomainError> {
        let pending = self.ask(question).await?;
        let guard = PhaseGuard::new(self, SessionEvent::AnswerFailed);
        let collected = pending.fragments.try_collect::<String>().await;
        guard.disarm();

        match collected {
            Ok(response) => {
                self.finish_answer(&pending.question, &response)?;
                Ok(CompletedAnswer {
                    response,
                    context: pending.context,
                })
            }
            Err(e) => {
                self.fail_answer(&e);
                Err(e)
            }
        }
    }
}

/// Holds a session in a transient phase. Unless completed or disarmed, drop
/// dispatches the abandon event, so a cancelled future or an unwinding panic
/// cannot leave the session `Ingesting` or `AwaitingAnswer`.
struct PhaseGuard<'a> {
    session: &'a mut Session,
    on_abandon: Option<SessionEvent>,
}

impl<'a> PhaseGuard<'a> {
    fn new(session: &'a mut Session, on_abandon: SessionEvent) -> Self {
        Self {
            session,
            on_abandon: Some(on_abandon),
        }
    }

    fn complete(mut self, event: SessionEvent) -> Result<(), DomainError> {
        self.on_abandon = None;
        self.session.dispatch(event)
    }

    fn disarm(mut self) {
        self.on_abandon = None;
    }
}

impl Deref for PhaseGuard<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.session
    }
}

impl DerefMut for PhaseGuard<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        self.session
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        let Some(event) = self.on_abandon.take() else {
            return;
        };
        tracing::warn!(session_id = %self.session.id, ?event, "operation abandoned, rolling back");
        if let Err(e) = self.session.dispatch(event) {
            tracing::warn!(error = %e, "rollback rejected");
        }
    }
}
