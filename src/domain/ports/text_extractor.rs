use crate::domain::errors::DomainError;

/// Turns the raw bytes of an upload into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, DomainError>;
}
