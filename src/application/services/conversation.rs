use std::sync::{Arc, RwLock};
use tracing::instrument;

use crate::application::services::RagService;
use crate::domain::{
    ports::{LlmService, TextStream, VectorStore},
    ConversationMemory, DomainError, PromptContext, PromptTemplate,
};

pub type SharedMemory = Arc<RwLock<ConversationMemory>>;

/// Retrieval + prompt template + model + memory, composed into one question-answering step.
pub struct ConversationalPipeline {
    rag: RagService,
    llm: Arc<dyn LlmService>,
    template: PromptTemplate,
    memory: SharedMemory,
}

impl ConversationalPipeline {
    pub fn new(
        rag: RagService,
        llm: Arc<dyn LlmService>,
        template: PromptTemplate,
        memory: SharedMemory,
    ) -> Self {
        Self {
            rag,
            llm,
            template,
            memory,
        }
    }

    pub fn bind_index(&mut self, vector_store: Arc<dyn VectorStore>) {
        self.rag.bind(vector_store);
    }

    pub fn memory(&self) -> &SharedMemory {
        &self.memory
    }

    #[instrument(skip(self))]
    pub async fn prepare(&self, question: &str) -> Result<PromptContext, DomainError> {
        let retrieved = self.rag.retrieve(question).await?;
        let history = self
            .memory
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .history_text();

        tracing::debug!(chunks = retrieved.len(), "prompt context assembled");
        Ok(PromptContext::build(
            &self.template,
            retrieved,
            history,
            question,
        ))
    }

    /// Starts generation. The caller consumes the fragments and then calls
    /// [`ConversationalPipeline::record`] with the full response.
    #[instrument(skip(self))]
    pub async fn stream(&self, question: &str) -> Result<(PromptContext, TextStream), DomainError> {
        let context = self.prepare(question).await?;
        let fragments = self.llm.generate(&context.prompt).await?;
        Ok((context, fragments))
    }

    pub fn record(&self, question: &str, response: &str) -> Result<(), DomainError> {
        self.memory
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .save_turn(question, response);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn answer(&self, question: &str) -> Result<String, DomainError> {
        let context = self.prepare(question).await?;
        let response = self.llm.complete(&context.prompt).await?;
        self.record(question, &response)?;
        Ok(response)
    }
}
