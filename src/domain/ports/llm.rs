use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::TryStreamExt;

use crate::domain::errors::DomainError;

/// Lazily produced fragments of a completion, in order.
pub type TextStream = BoxStream<'static, Result<String, DomainError>>;

#[async_trait]
pub trait LlmService: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<TextStream, DomainError>;

    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        self.generate(prompt).await?.try_collect().await
    }
}
