use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;
use uuid::Uuid;

use crate::application::services::{Session, SessionServices};
use crate::domain::DomainError;

pub type SessionHandle = Arc<Mutex<Session>>;

struct Entry {
    session: SessionHandle,
    last_seen: DateTime<Utc>,
}

/// Live sessions keyed by id. Sessions idle past the timeout are dropped by
/// [`SessionRegistry::sweep_idle`].
pub struct SessionRegistry {
    services: Arc<SessionServices>,
    sessions: RwLock<HashMap<Uuid, Entry>>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(services: Arc<SessionServices>, idle_timeout: Duration) -> Self {
        Self {
            services,
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub fn services(&self) -> &Arc<SessionServices> {
        &self.services
    }

    #[instrument(skip(self))]
    pub async fn create(&self) -> Result<(Uuid, SessionHandle), DomainError> {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(
            Session::open(id, self.services.clone()).await?,
        ));

        self.sessions.write().await.insert(
            id,
            Entry {
                session: session.clone(),
                last_seen: Utc::now(),
            },
        );
        tracing::info!(session_id = %id, "session created");
        Ok((id, session))
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_seen = Utc::now();
        Some(entry.session.clone())
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            tracing::info!(session_id = %id, "session ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drops sessions idle longer than the timeout, skipping any that are
    /// busy answering right now. Returns how many were dropped.
    pub async fn sweep_idle(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, entry| {
            let idle = now - entry.last_seen > self.idle_timeout;
            let busy = entry.session.try_lock().is_err();
            if idle && !busy {
                tracing::info!(session_id = %id, "session expired");
                false
            } else {
                true
            }
        });

        before - sessions.len()
    }
}
