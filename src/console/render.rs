use futures::StreamExt;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::domain::{ports::TextStream, DomainError};

/// Writes answer fragments as they arrive, optionally pausing after each one.
///
/// The pause is purely cosmetic and has no effect on what is generated.
pub struct TypingRenderer<W> {
    out: W,
    delay: Duration,
}

impl<W: AsyncWrite + Unpin> TypingRenderer<W> {
    pub fn new(out: W, delay: Duration) -> Self {
        Self { out, delay }
    }

    pub fn instant(out: W) -> Self {
        Self::new(out, Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Renders every fragment and returns the full text. On a stream error the
    /// fragments written so far stay on screen.
    pub async fn render(&mut self, mut fragments: TextStream) -> Result<String, DomainError> {
        let mut full = String::new();

        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            self.write(&fragment).await?;
            full.push_str(&fragment);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        self.write("\n").await?;
        Ok(full)
    }

    pub async fn line(&mut self, text: &str) -> Result<(), DomainError> {
        self.write(text).await?;
        self.write("\n").await
    }

    async fn write(&mut self, text: &str) -> Result<(), DomainError> {
        self.out
            .write_all(text.as_bytes())
            .await
            .map_err(|e| DomainError::internal(format!("console output: {e}")))?;
        self.out
            .flush()
            .await
            .map_err(|e| DomainError::internal(format!("console output: {e}")))
    }
}
