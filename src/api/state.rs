use std::sync::Arc;

use crate::application::{SessionHandle, SessionRegistry};
use crate::domain::DomainError;
use crate::infrastructure::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: AppConfig, sessions: SessionRegistry) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
        }
    }

    pub async fn session(&self, id: uuid::Uuid) -> Result<SessionHandle, DomainError> {
        self.sessions
            .get(id)
            .await
            .ok_or_else(|| DomainError::not_found(format!("session {id}")))
    }
}
