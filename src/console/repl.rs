use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite};

use crate::application::{Session, UploadOutcome};
use crate::console::TypingRenderer;
use crate::domain::{ensure_pdf, DomainError, UploadedDocument};

const HELP: &str = "Commands: /upload <path.pdf>, /history, /help, /quit. Anything else is a question.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload(PathBuf),
    Ask(String),
    History,
    Help,
    Quit,
    Empty,
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }

    let (head, rest) = line
        .split_once(char::is_whitespace)
        .map(|(h, r)| (h, r.trim()))
        .unwrap_or((line, ""));

    match head {
        "/upload" if !rest.is_empty() => Command::Upload(PathBuf::from(rest)),
        "/upload" | "/help" => Command::Help,
        "/history" => Command::History,
        "/quit" | "/exit" => Command::Quit,
        _ => Command::Ask(line.to_string()),
    }
}

/// Drives one session from a line reader, rendering answers as they stream.
pub struct Console<W> {
    session: Session,
    renderer: TypingRenderer<W>,
    no_document_message: String,
}

impl<W: AsyncWrite + Unpin> Console<W> {
    pub fn new(
        session: Session,
        renderer: TypingRenderer<W>,
        no_document_message: String,
    ) -> Self {
        Self {
            session,
            renderer,
            no_document_message,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_parts(self) -> (Session, TypingRenderer<W>) {
        (self.session, self.renderer)
    }

    /// Reads commands until `/quit` or end of input.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> Result<(), DomainError> {
        if self.session.documents().is_empty() {
            self.renderer.line(&self.no_document_message).await?;
        }

        let mut lines = input.lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| DomainError::internal(format!("console input: {e}")))?
        {
            match parse_command(&line) {
                Command::Quit => break,
                Command::Empty => {}
                Command::Help => self.renderer.line(HELP).await?,
                Command::History => self.print_history().await?,
                Command::Upload(path) => self.upload_path(&path).await?,
                Command::Ask(question) => self.ask(&question).await?,
            }
        }

        Ok(())
    }

    /// Uploads a PDF from disk. Failures are reported on the console and do
    /// not end the loop.
    pub async fn upload_path(&mut self, path: &Path) -> Result<(), DomainError> {
        match self.try_upload(path).await {
            Ok(UploadOutcome::Ingested {
                storage_name,
                chunks,
            }) => {
                self.renderer
                    .line(&format!("Indexed {storage_name} ({chunks} chunks)."))
                    .await
            }
            Ok(UploadOutcome::Skipped { storage_name }) => {
                self.renderer
                    .line(&format!("{storage_name} is already indexed."))
                    .await
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "upload failed");
                self.renderer.line(&format!("Upload failed: {e}")).await
            }
        }
    }

    async fn try_upload(&mut self, path: &Path) -> Result<UploadOutcome, DomainError> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DomainError::validation(format!("{} is not a file", path.display())))?
            .to_string();
        ensure_pdf(&filename, None)?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DomainError::storage(format!("read {}: {e}", path.display())))?;
        self.session
            .upload(UploadedDocument::new(filename, bytes))
            .await
    }

    async fn ask(&mut self, question: &str) -> Result<(), DomainError> {
        let pending = match self.session.ask(question).await {
            Ok(pending) => pending,
            Err(DomainError::NoDocument) => {
                return self.renderer.line(&self.no_document_message).await;
            }
            Err(e) => return self.renderer.line(&format!("Error: {e}")).await,
        };

        match self.renderer.render(pending.fragments).await {
            Ok(response) => self.session.finish_answer(&pending.question, &response),
            Err(e) => {
                self.session.fail_answer(&e);
                self.renderer.line(&format!("\nError: {e}")).await
            }
        }
    }

    async fn print_history(&mut self) -> Result<(), DomainError> {
        let lines: Vec<String> = self
            .session
            .history()
            .iter()
            .map(|m| format!("{}: {}", m.role.prompt_label(), m.content))
            .collect();
        for line in lines {
            self.renderer.line(&line).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("/upload ./docs/sky.pdf"),
            Command::Upload(PathBuf::from("./docs/sky.pdf"))
        );
        assert_eq!(parse_command("/upload"), Command::Help);
        assert_eq!(parse_command("  /quit "), Command::Quit);
        assert_eq!(parse_command("/exit"), Command::Quit);
        assert_eq!(parse_command("/history"), Command::History);
        assert_eq!(parse_command("   "), Command::Empty);
        assert_eq!(
            parse_command("What color is the sky?"),
            Command::Ask("What color is the sky?".to_string())
        );
    }

    #[test]
    fn test_upload_path_keeps_spaces() {
        assert_eq!(
            parse_command("/upload my report.pdf"),
            Command::Upload(PathBuf::from("my report.pdf"))
        );
    }
}
