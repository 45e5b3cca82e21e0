//! In-memory session store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, SessionId, SessionPhase, UserId};
use crate::domain::session::Session;
use crate::ports::SessionRepository;

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, session: &Session) -> Result<(), DomainError> {
        let mut sessions = self.sessions.write().await;

        if sessions.contains_key(session.id()) {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("Session {} already exists", session.id()),
            ));
        }

        let practitioner_busy = session.phase().is_open()
            && sessions.values().any(|s| {
                s.practitioner_id() == session.practitioner_id() && s.phase().is_open()
            });
        if practitioner_busy {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                "Practitioner already has an open session",
            )
            .with_detail("practitioner_id", session.practitioner_id().to_string()));
        }

        sessions.insert(*session.id(), session.clone());
        Ok(())
    }

    async fn update_if_version(
        &self,
        session: &Session,
        expected_version: i64,
    ) -> Result<bool, DomainError> {
        let mut sessions = self.sessions.write().await;

        let stored = sessions.get_mut(session.id()).ok_or_else(|| {
            DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Session not found: {}", session.id()),
            )
        })?;

        if stored.version() != expected_version {
            return Ok(false);
        }

        *stored = session.clone();
        Ok(true)
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, DomainError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn find_by_phase(&self, phase: SessionPhase) -> Result<Vec<Session>, DomainError> {
        let mut found: Vec<Session> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.phase() == phase)
            .cloned()
            .collect();
        found.sort_by_key(|s| *s.created_at());
        Ok(found)
    }

    async fn find_open_by_practitioner(
        &self,
        practitioner_id: &UserId,
    ) -> Result<Vec<Session>, DomainError> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.practitioner_id() == practitioner_id && s.phase().is_open())
            .cloned()
            .collect())
    }

    async fn find_by_participant(&self, user_id: &UserId) -> Result<Vec<Session>, DomainError> {
        let mut found: Vec<Session> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.is_participant(user_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at().cmp(a.created_at()));
        Ok(found)
    }
}
