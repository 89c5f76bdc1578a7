use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;
use tracing::instrument;

use super::ndjson::decode_fragments;
use crate::domain::{
    ports::{LlmService, TextStream},
    DomainError,
};
use crate::infrastructure::config::LlmConfig;

/// Streaming completions from a local Ollama instance via `POST /api/generate`.
///
/// Sampling options are fixed at construction.
pub struct OllamaLlm {
    client: reqwest::Client,
    base_url: String,
    model: String,
    options: SamplingOptions,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct SamplingOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: SamplingOptions,
}

impl OllamaLlm {
    pub fn from_config(config: &LlmConfig) -> Result<Self, DomainError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| DomainError::internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            options: SamplingOptions {
                temperature: config.temperature,
                top_p: config.top_p,
            },
        })
    }

    fn request<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt,
            stream: true,
            options: self.options,
        }
    }
}

#[async_trait]
impl LlmService for OllamaLlm {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<TextStream, DomainError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DomainError::timeout(format!("Ollama generation: {e}"))
                } else {
                    DomainError::external(format!(
                        "Ollama connection error (is Ollama running at {}?): {e}",
                        self.base_url
                    ))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::external(format!(
                "Ollama API error {status}: {body}"
            )));
        }

        Ok(decode_fragments(response.bytes_stream()).boxed())
    }
}
