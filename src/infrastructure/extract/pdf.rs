use crate::domain::{ports::TextExtractor, DomainError};

/// Extracts the text layer of a PDF. Scanned pages without text come back empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, DomainError> {
        pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| DomainError::extraction(format!("PDF extraction failed: {e}")))
    }
}
