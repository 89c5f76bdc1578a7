use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::errors::{DomainError, Result};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// How an upload is recognised as already ingested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Same filename means same document; contents are not compared.
    #[default]
    Filename,
    /// Same SHA-256 of the bytes means same document.
    ContentHash,
}

#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub id: Uuid,
    pub filename: String,
    pub bytes: Vec<u8>,
    pub path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            bytes,
            path: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Name of the file in the content directory. Doubles as the dedup key.
    pub fn storage_name(&self, policy: DedupPolicy) -> String {
        match policy {
            DedupPolicy::Filename => format!("{}.pdf", pdf_stem(&self.filename)),
            DedupPolicy::ContentHash => format!("{}.pdf", self.content_hash()),
        }
    }
}

/// Base name of an upload without directories and without a trailing `.pdf`.
fn pdf_stem(filename: &str) -> &str {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    let has_suffix = base
        .len()
        .checked_sub(4)
        .and_then(|at| base.get(at..))
        .is_some_and(|ext| ext.eq_ignore_ascii_case(".pdf"));
    let stem = if has_suffix {
        &base[..base.len() - 4]
    } else {
        base
    };

    if stem.is_empty() || stem == "." || stem == ".." {
        "document"
    } else {
        stem
    }
}

/// Accepts an upload only when it is declared or named as a PDF.
pub fn ensure_pdf(filename: &str, content_type: Option<&str>) -> Result<()> {
    let by_type = content_type
        .map(|ct| ct.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE))
        .unwrap_or(false);
    let by_name = filename.to_ascii_lowercase().ends_with(".pdf");

    if by_type || by_name {
        Ok(())
    } else {
        Err(DomainError::unsupported_media(format!(
            "{filename} is not a PDF"
        )))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub source: String,
    pub content: String,
    pub chunk_index: usize,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(
        document_id: Uuid,
        source: impl Into<String>,
        content: impl Into<String>,
        chunk_index: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            source: source.into(),
            content: content.into(),
            chunk_index,
            metadata: ChunkMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ChunkMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Character offsets of a chunk within the extracted document text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingPolicy {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl ChunkingPolicy {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(DomainError::validation("chunk_size must be positive"));
        }
        if chunk_overlap >= chunk_size {
            return Err(DomainError::validation(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

impl Default for ChunkingPolicy {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 200,
        }
    }
}

/// Splits text into fixed windows of at most `chunk_size` characters.
///
/// Windows start every `chunk_size - chunk_overlap` characters and the last
/// one ends at the end of the text, so neighbours share exactly
/// `chunk_overlap` characters. Lengths count chars, not bytes. Blank text
/// yields no chunks.
pub fn chunk_content(
    document_id: Uuid,
    source: &str,
    content: &str,
    policy: &ChunkingPolicy,
) -> Vec<DocumentChunk> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    let bounds: Vec<usize> = content
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(content.len()))
        .collect();
    let total = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + policy.chunk_size).min(total);
        let text = &content[bounds[start]..bounds[end]];

        chunks.push(
            DocumentChunk::new(document_id, source, text, chunks.len())
                .with_metadata(ChunkMetadata { start, end }),
        );

        if end == total {
            break;
        }
        start += policy.step();
    }

    chunks
}
