#![allow(dead_code)]

use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pdf_chat::application::{DocumentService, SessionServices};
use pdf_chat::domain::{
    ports::{
        DocumentStore, EmbeddingService, LlmService, TextExtractor, TextStream, VectorStoreFactory,
    },
    DomainError, Embedding, PromptTemplate,
};
use pdf_chat::infrastructure::{FsDocumentStore, InMemoryIndexFactory, PersistentIndexFactory};

pub const SKY: &str = "The sky is blue.";
pub const SKY_QUESTION: &str = "What color is the sky?";

/// A compact template so tests can assert on exact prompt text.
pub fn test_template() -> PromptTemplate {
    PromptTemplate::new("CONTEXT:\n{context}\nHISTORY:\n{history}\nQUESTION: {question}")
}

/// Counts writes on top of a real directory store.
pub struct CountingStore {
    inner: FsDocumentStore,
    pub saves: AtomicUsize,
}

impl CountingStore {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: FsDocumentStore::new(root),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn exists(&self, name: &str) -> Result<bool, DomainError> {
        self.inner.exists(name).await
    }

    async fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, DomainError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(name, bytes).await
    }

    async fn list(&self) -> Result<Vec<String>, DomainError> {
        self.inner.list().await
    }
}

/// Treats uploads as UTF-8 text; anything starting with `%BROKEN` fails.
pub struct Utf8Extractor;

impl TextExtractor for Utf8Extractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, DomainError> {
        if bytes.starts_with(b"%BROKEN") {
            return Err(DomainError::extraction("unreadable xref table"));
        }
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

const KEYWORDS: [&str; 6] = ["sky", "blue", "grass", "green", "color", "sea"];

/// One dimension per keyword plus a constant bias.
pub struct KeywordEmbedding {
    pub batches: AtomicUsize,
    stall_next: AtomicBool,
}

impl KeywordEmbedding {
    pub fn new() -> Self {
        Self {
            batches: AtomicUsize::new(0),
            stall_next: AtomicBool::new(false),
        }
    }

    /// The next batch never completes.
    pub fn stall_next(&self) {
        self.stall_next.store(true, Ordering::SeqCst);
    }

    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    fn vector(text: &str) -> Embedding {
        let lower = text.to_lowercase();
        let mut v: Vec<f32> = KEYWORDS
            .iter()
            .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
            .collect();
        v.push(0.1);
        Embedding::new(v)
    }
}

#[async_trait]
impl EmbeddingService for KeywordEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        if self.stall_next.swap(false, Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn model_name(&self) -> &str {
        "keywords"
    }
}

/// Answers from whatever context the prompt carries and keeps every prompt.
pub struct ScriptedLlm {
    prompts: Mutex<Vec<String>>,
    fail_next: AtomicBool,
    stall_next: AtomicBool,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
            stall_next: AtomicBool::new(false),
        }
    }

    /// The next answer streams one fragment and then never finishes.
    pub fn stall_next(&self) {
        self.stall_next.store(true, Ordering::SeqCst);
    }

    /// The next answer streams one fragment and then errors.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<TextStream, DomainError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if self.fail_next.swap(false, Ordering::SeqCst) {
            let parts = vec![
                Ok("The sky".to_string()),
                Err(DomainError::external("connection reset")),
            ];
            return Ok(stream::iter(parts).boxed());
        }

        if self.stall_next.swap(false, Ordering::SeqCst) {
            let head = stream::iter(vec![Ok("The sky".to_string())]);
            return Ok(head.chain(stream::pending()).boxed());
        }

        let parts: Vec<Result<String, DomainError>> = if prompt.contains(SKY) {
            vec![Ok("The sky ".into()), Ok("is ".into()), Ok("blue.".into())]
        } else {
            vec![Ok("I don't know.".into())]
        };
        Ok(stream::iter(parts).boxed())
    }
}

pub struct Harness {
    pub services: Arc<SessionServices>,
    pub store: Arc<CountingStore>,
    pub embedding: Arc<KeywordEmbedding>,
    pub llm: Arc<ScriptedLlm>,
    pub content_dir: PathBuf,
}

impl Harness {
    /// In-memory index; every session starts with an empty one.
    pub fn in_memory(root: &Path) -> Self {
        Self::build(root, Arc::new(InMemoryIndexFactory))
    }

    /// Index persisted under `<root>/index`.
    pub fn persistent(root: &Path) -> Self {
        Self::build(root, Arc::new(PersistentIndexFactory::new(root.join("index"))))
    }

    fn build(root: &Path, index_factory: Arc<dyn VectorStoreFactory>) -> Self {
        let content_dir = root.join("files");
        let store = Arc::new(CountingStore::new(&content_dir));
        let embedding = Arc::new(KeywordEmbedding::new());
        let llm = Arc::new(ScriptedLlm::new());

        let services = SessionServices {
            documents: Arc::new(DocumentService::new(store.clone(), Arc::new(Utf8Extractor))),
            embedding: embedding.clone(),
            llm: llm.clone(),
            index_factory,
            template: test_template(),
            top_k: 4,
        };

        Self {
            services: Arc::new(services),
            store,
            embedding,
            llm,
            content_dir,
        }
    }
}
