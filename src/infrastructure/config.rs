use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::{ChunkingPolicy, DedupPolicy, DomainError, PromptTemplate};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.1";

/// Everything loaded from the config directory.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

impl AppConfig {
    /// Reads `config.yaml` and `prompts.yaml` from `dir`, falling back to
    /// defaults for missing files, then applies environment overrides.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let dir = dir.as_ref();
        let mut config: Config = read_yaml(&dir.join("config.yaml"))?.unwrap_or_default();
        let prompts: PromptsConfig = read_yaml(&dir.join("prompts.yaml"))?.unwrap_or_default();

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(Self { config, prompts })
    }

    /// Loads from `CONFIG_DIR`, or `config/` when unset.
    pub fn from_env() -> Result<Self, DomainError> {
        let dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".into());
        Self::load(dir)
    }
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, DomainError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&raw)
        .map(Some)
        .map_err(|e| DomainError::validation(format!("{}: {e}", path.display())))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub chunking: ChunkingConfig,
    pub rag: RagConfig,
    pub storage: StorageConfig,
    pub ingest: IngestConfig,
    pub session: SessionConfig,
    pub cors: CorsConfig,
    pub console: ConsoleConfig,
}

impl Config {
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), DomainError> {
        if let Some(host) = var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("SERVER_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| DomainError::validation(format!("SERVER_PORT={port} is not a port")))?;
        }
        if let Some(url) = var("OLLAMA_BASE_URL") {
            self.llm.base_url = url.clone();
            self.embedding.base_url = url;
        }
        if let Some(model) = var("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(model) = var("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dir) = var("CONTENT_DIR") {
            self.storage.content_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("INDEX_DIR") {
            self.storage.index_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.chunking.policy()?;
        if self.rag.top_k == 0 {
            return Err(DomainError::validation("rag.top_k must be positive"));
        }
        if !(0.0..=1.0).contains(&self.llm.top_p) {
            return Err(DomainError::validation("llm.top_p must be within 0..=1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body limit for document uploads.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_bytes: 200 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    /// No timeout when unset.
    pub timeout_seconds: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.5,
            top_p: 0.9,
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    pub fn policy(&self) -> Result<ChunkingPolicy, DomainError> {
        ChunkingPolicy::new(self.chunk_size, self.chunk_overlap)
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        let policy = ChunkingPolicy::default();
        Self {
            chunk_size: policy.chunk_size,
            chunk_overlap: policy.chunk_overlap,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub content_dir: PathBuf,
    /// In-memory index when unset.
    pub index_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("files"),
            index_dir: Some(PathBuf::from("index")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub dedup: DedupPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub idle_timeout_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_seconds: 3600,
            sweep_interval_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Cosmetic pause between rendered fragments; `0` disables it.
    pub typing_delay_ms: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { typing_delay_ms: 50 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub chat: ChatPrompts,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatPrompts {
    pub template: PromptTemplate,
    pub no_document_message: String,
}

impl Default for ChatPrompts {
    fn default() -> Self {
        Self {
            template: PromptTemplate::default(),
            no_document_message: "Please upload a PDF file.".to_string(),
        }
    }
}
