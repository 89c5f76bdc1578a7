mod ndjson;
mod ollama;

pub use ollama::OllamaLlm;
