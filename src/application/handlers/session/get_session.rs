//! GetSessionHandler - read one session with both parties' profiles.
//!
//! Reading a session past its waiting deadline or live countdown ends it
//! first, through the same transition the sweep uses.

use std::sync::Arc;

use crate::domain::foundation::{CommandMetadata, SessionId, Timestamp, UserId};
use crate::domain::participant::Participant;
use crate::domain::session::{Session, SessionError};

use super::coordinator::SessionCoordinator;
use super::SessionPolicy;

/// Query for a single session.
#[derive(Debug, Clone)]
pub struct GetSessionQuery {
    pub session_id: SessionId,
    pub user_id: UserId,
}

/// A session with denormalized participant profiles.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub session: Session,
    pub guest: Option<Participant>,
    pub practitioner: Option<Participant>,
}

pub struct GetSessionHandler {
    coordinator: Arc<SessionCoordinator>,
    policy: SessionPolicy,
}

impl GetSessionHandler {
    pub fn new(coordinator: Arc<SessionCoordinator>, policy: SessionPolicy) -> Self {
        Self {
            coordinator,
            policy,
        }
    }

    pub async fn handle(
        &self,
        query: GetSessionQuery,
        metadata: CommandMetadata,
    ) -> Result<SessionView, SessionError> {
        let session = self.coordinator.load(&query.session_id).await?;
        if !session.is_participant(&query.user_id) {
            return Err(SessionError::NotParticipant);
        }

        let session = self
            .coordinator
            .expire_if_due(session, &self.policy, Timestamp::now(), &metadata)
            .await?;

        let directory = self.coordinator.directory();
        let guest = directory.find(session.guest_id()).await?;
        let practitioner = directory.find(session.practitioner_id()).await?;

        Ok(SessionView {
            session,
            guest,
            practitioner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::locks::InProcessKeyedLock;
    use crate::adapters::memory::{InMemoryParticipantDirectory, InMemorySessionRepository};
    use crate::domain::foundation::SessionPhase;
    use crate::domain::session::EndReason;
    use crate::ports::{ParticipantDirectory, SessionRepository};

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    async fn handler_with(session: &Session) -> (GetSessionHandler, Arc<InMemoryParticipantDirectory>) {
        let sessions = Arc::new(InMemorySessionRepository::new());
        sessions.insert(session).await.unwrap();
        let directory = Arc::new(InMemoryParticipantDirectory::with_participants([
            Participant::guest(uid("guest")).with_display_name("Gwen"),
            Participant::practitioner(uid("healer"))
                .with_display_name("Hal")
                .online(),
        ]));
        directory.set_in_service(&uid("healer"), true).await.unwrap();

        let coordinator = Arc::new(SessionCoordinator::new(
            sessions,
            directory.clone(),
            Arc::new(InProcessKeyedLock::default()),
            Arc::new(InMemoryEventBus::new()),
        ));
        (
            GetSessionHandler::new(coordinator, SessionPolicy::default()),
            directory,
        )
    }

    fn session_started(secs_ago: u64) -> Session {
        Session::new(
            SessionId::new(),
            uid("guest"),
            uid("healer"),
            120,
            900,
            Timestamp::now().minus_secs(secs_ago),
        )
        .unwrap()
    }

    fn query(session: &Session, user: &str) -> GetSessionQuery {
        GetSessionQuery {
            session_id: *session.id(),
            user_id: uid(user),
        }
    }

    #[tokio::test]
    async fn participant_sees_session_with_profiles() {
        let session = session_started(0);
        let (handler, _) = handler_with(&session).await;

        let view = handler
            .handle(query(&session, "guest"), CommandMetadata::for_user(uid("guest")))
            .await
            .unwrap();

        assert_eq!(view.session.phase(), SessionPhase::Waiting);
        assert_eq!(view.guest.unwrap().display_name.as_deref(), Some("Gwen"));
        assert_eq!(view.practitioner.unwrap().display_name.as_deref(), Some("Hal"));
    }

    #[tokio::test]
    async fn stranger_cannot_read_session() {
        let session = session_started(0);
        let (handler, _) = handler_with(&session).await;

        let err = handler
            .handle(query(&session, "stranger"), CommandMetadata::for_user(uid("stranger")))
            .await
            .unwrap_err();

        assert_eq!(err, SessionError::NotParticipant);
    }

    #[tokio::test]
    async fn expired_waiting_session_is_ended_on_read() {
        let session = session_started(300);
        let (handler, directory) = handler_with(&session).await;

        let view = handler
            .handle(query(&session, "healer"), CommandMetadata::for_user(uid("healer")))
            .await
            .unwrap();

        assert_eq!(view.session.phase(), SessionPhase::Ended);
        assert_eq!(view.session.end_reason(), Some(EndReason::WaitingTimedOut));
        let healer = directory.find(&uid("healer")).await.unwrap().unwrap();
        assert!(!healer.in_service);
    }

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let session = session_started(0);
        let (handler, _) = handler_with(&session).await;
        let id = SessionId::new();

        let err = handler
            .handle(
                GetSessionQuery {
                    session_id: id,
                    user_id: uid("guest"),
                },
                CommandMetadata::for_user(uid("guest")),
            )
            .await
            .unwrap_err();

        assert_eq!(err, SessionError::NotFound(id));
    }
}
