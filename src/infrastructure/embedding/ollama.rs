use async_trait::async_trait;
use rig::client::{EmbeddingsClient, Nothing};
use rig::embeddings::EmbeddingsBuilder;
use rig::providers::ollama;

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::EmbeddingConfig;

/// Embeddings from a local Ollama instance through rig's ollama provider.
pub struct OllamaEmbedding {
    client: ollama::Client,
    model: String,
}

impl OllamaEmbedding {
    pub fn new(base_url: &str, model: impl Into<String>) -> Result<Self, DomainError> {
        let client = ollama::Client::builder()
            .api_key(Nothing)
            .base_url(base_url.trim_end_matches('/'))
            .build()
            .map_err(|e| DomainError::external(format!("Ollama client: {e}")))?;

        Ok(Self {
            client,
            model: model.into(),
        })
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, DomainError> {
        Self::new(&config.base_url, &config.model)
    }
}

#[async_trait]
impl EmbeddingService for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::external("Ollama returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.client.embedding_model(&self.model);

        let mut builder = EmbeddingsBuilder::new(model);
        for text in texts {
            builder = builder
                .document(*text)
                .map_err(|e| DomainError::external(e.to_string()))?;
        }

        let embeddings = builder
            .build()
            .await
            .map_err(|e| DomainError::external(format!("Ollama embedding error: {e}")))?;

        tracing::debug!(model = %self.model, count = embeddings.len(), "embeddings received");

        Ok(embeddings
            .into_iter()
            .map(|(_doc, emb)| {
                let vec_f32: Vec<f32> = emb.first().vec.into_iter().map(|x| x as f32).collect();
                Embedding::new(vec_f32)
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_batch_skips_the_service() {
        let embedding = OllamaEmbedding::new("http://127.0.0.1:9", "nomic-embed-text").unwrap();
        assert!(embedding.embed_batch(&[]).await.unwrap().is_empty());
        assert_eq!(embedding.model_name(), "nomic-embed-text");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_external_error() {
        let embedding = OllamaEmbedding::new("http://127.0.0.1:9", "m").unwrap();
        let err = embedding.embed("hello").await.unwrap_err();
        assert!(matches!(err, DomainError::ExternalService(_)));
    }
}
