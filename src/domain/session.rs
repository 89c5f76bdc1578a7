//! Session lifecycle as an explicit state machine.
//!
//! A [`SessionPhase`] is an immutable value; applying a [`SessionEvent`]
//! yields the next phase or rejects the pair with
//! [`DomainError::InvalidTransition`].

use crate::domain::errors::{DomainError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Uninitialized,
    AwaitingUpload,
    /// `was_ready` records the phase to fall back to if ingestion fails.
    Ingesting { was_ready: bool },
    Ready,
    AwaitingAnswer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Initialized,
    UploadReceived,
    UploadSkipped,
    IngestionFinished,
    IngestionFailed,
    QuestionSubmitted,
    AnswerFinished,
    AnswerFailed,
}

impl SessionPhase {
    pub fn apply(self, event: SessionEvent) -> Result<SessionPhase> {
        use SessionEvent as E;
        use SessionPhase as P;

        let next = match (self, event) {
            (P::Uninitialized, E::Initialized) => P::AwaitingUpload,
            (P::AwaitingUpload, E::UploadReceived) => P::Ingesting { was_ready: false },
            (P::Ready, E::UploadReceived) => P::Ingesting { was_ready: true },
            (P::AwaitingUpload | P::Ready, E::UploadSkipped) => P::Ready,
            (P::Ingesting { .. }, E::IngestionFinished) => P::Ready,
            (P::Ingesting { was_ready: true }, E::IngestionFailed) => P::Ready,
            (P::Ingesting { was_ready: false }, E::IngestionFailed) => P::AwaitingUpload,
            (P::Ready, E::QuestionSubmitted) => P::AwaitingAnswer,
            (P::AwaitingAnswer, E::AnswerFinished | E::AnswerFailed) => P::Ready,
            (from, event) => return Err(DomainError::InvalidTransition { from, event }),
        };

        Ok(next)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SessionPhase::Ready)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::AwaitingUpload => "awaiting_upload",
            Self::Ingesting { .. } => "ingesting",
            Self::Ready => "ready",
            Self::AwaitingAnswer => "awaiting_answer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let phase = SessionPhase::default()
            .apply(SessionEvent::Initialized)
            .and_then(|p| p.apply(SessionEvent::UploadReceived))
            .and_then(|p| p.apply(SessionEvent::IngestionFinished))
            .and_then(|p| p.apply(SessionEvent::QuestionSubmitted))
            .and_then(|p| p.apply(SessionEvent::AnswerFinished))
            .unwrap();

        assert_eq!(phase, SessionPhase::Ready);
    }

    #[test]
    fn test_failed_ingestion_restores_previous_phase() {
        let first = SessionPhase::AwaitingUpload
            .apply(SessionEvent::UploadReceived)
            .and_then(|p| p.apply(SessionEvent::IngestionFailed))
            .unwrap();
        assert_eq!(first, SessionPhase::AwaitingUpload);

        let later = SessionPhase::Ready
            .apply(SessionEvent::UploadReceived)
            .and_then(|p| p.apply(SessionEvent::IngestionFailed))
            .unwrap();
        assert_eq!(later, SessionPhase::Ready);
    }

    #[test]
    fn test_skipped_upload_is_ready() {
        let phase = SessionPhase::AwaitingUpload
            .apply(SessionEvent::UploadSkipped)
            .unwrap();
        assert_eq!(phase, SessionPhase::Ready);
    }

    #[test]
    fn test_question_before_upload_rejected() {
        let err = SessionPhase::AwaitingUpload
            .apply(SessionEvent::QuestionSubmitted)
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::InvalidTransition {
                from: SessionPhase::AwaitingUpload,
                event: SessionEvent::QuestionSubmitted,
            }
        ));
    }

    #[test]
    fn test_failed_answer_returns_to_ready() {
        let phase = SessionPhase::AwaitingAnswer
            .apply(SessionEvent::AnswerFailed)
            .unwrap();
        assert_eq!(phase, SessionPhase::Ready);
    }
}
