//! ApplySessionActionHandler - a participant moves the session along.

use std::sync::Arc;

use crate::domain::foundation::{CommandMetadata, SessionId, Timestamp, UserId};
use crate::domain::session::{Actor, Session, SessionAction, SessionError};

use super::coordinator::SessionCoordinator;

/// Command to apply a participant action.
#[derive(Debug, Clone)]
pub struct ApplySessionActionCommand {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub action: SessionAction,
}

#[derive(Debug, Clone)]
pub struct ApplySessionActionResult {
    pub session: Session,

    /// False when the action was an accepted no-op.
    pub changed: bool,
}

pub struct ApplySessionActionHandler {
    coordinator: Arc<SessionCoordinator>,
}

impl ApplySessionActionHandler {
    pub fn new(coordinator: Arc<SessionCoordinator>) -> Self {
        Self { coordinator }
    }

    pub async fn handle(
        &self,
        cmd: ApplySessionActionCommand,
        metadata: CommandMetadata,
    ) -> Result<ApplySessionActionResult, SessionError> {
        let transition = self
            .coordinator
            .transition(
                &cmd.session_id,
                &Actor::User(cmd.user_id),
                cmd.action,
                Timestamp::now(),
                &metadata,
            )
            .await?;

        Ok(ApplySessionActionResult {
            changed: transition.applied(),
            session: transition.session,
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
    use crate::domain::participant::Participant;
    use crate::domain::session::EndReason;
    use crate::ports::{ParticipantDirectory, SessionRepository};

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    struct Fixture {
        sessions: Arc<InMemorySessionRepository>,
        directory: Arc<InMemoryParticipantDirectory>,
        handler: ApplySessionActionHandler,
        session_id: SessionId,
    }

    async fn fixture() -> Fixture {
        fixture_started(Timestamp::now()).await
    }

    async fn fixture_started(started_at: Timestamp) -> Fixture {
        let sessions = Arc::new(InMemorySessionRepository::new());
        let directory = Arc::new(InMemoryParticipantDirectory::with_participants([
            Participant::guest(uid("guest")),
            Participant::practitioner(uid("healer")).online(),
        ]));
        let session = Session::new(
            SessionId::new(),
            uid("guest"),
            uid("healer"),
            120,
            900,
            started_at,
        )
        .unwrap();
        sessions.insert(&session).await.unwrap();
        directory.set_in_service(&uid("healer"), true).await.unwrap();

        let coordinator = Arc::new(SessionCoordinator::new(
            sessions.clone(),
            directory.clone(),
            Arc::new(InProcessKeyedLock::default()),
            Arc::new(InMemoryEventBus::new()),
        ));
        Fixture {
            sessions,
            directory,
            handler: ApplySessionActionHandler::new(coordinator),
            session_id: *session.id(),
        }
    }

    async fn act(fx: &Fixture, user: &str, action: SessionAction) -> Result<ApplySessionActionResult, SessionError> {
        fx.handler
            .handle(
                ApplySessionActionCommand {
                    session_id: fx.session_id,
                    user_id: uid(user),
                    action,
                },
                CommandMetadata::for_user(uid(user)),
            )
            .await
    }

    #[tokio::test]
    async fn full_handshake_goes_live() {
        let fx = fixture().await;

        act(&fx, "healer", SessionAction::Acknowledge).await.unwrap();
        act(&fx, "guest", SessionAction::MarkReady).await.unwrap();
        let result = act(&fx, "healer", SessionAction::MarkReady).await.unwrap();

        assert!(result.changed);
        assert_eq!(result.session.phase(), SessionPhase::Live);
        assert!(result.session.live_started_at().is_some());
    }

    #[tokio::test]
    async fn accept_then_guest_ready_goes_live() {
        let fx = fixture().await;

        let accepted = act(&fx, "healer", SessionAction::Accept).await.unwrap();
        assert_eq!(accepted.session.phase(), SessionPhase::Waiting);

        let ready = act(&fx, "guest", SessionAction::MarkReady).await.unwrap();
        assert_eq!(ready.session.phase(), SessionPhase::Live);
    }

    #[tokio::test]
    async fn repeated_ready_is_a_no_op() {
        let fx = fixture().await;

        let first = act(&fx, "guest", SessionAction::MarkReady).await.unwrap();
        let second = act(&fx, "guest", SessionAction::MarkReady).await.unwrap();

        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(first.session.version(), second.session.version());
    }

    #[tokio::test]
    async fn reject_releases_practitioner_and_repeat_is_no_op() {
        let fx = fixture().await;

        let rejected = act(&fx, "healer", SessionAction::Reject).await.unwrap();
        assert_eq!(rejected.session.end_reason(), Some(EndReason::Rejected));
        let healer = fx.directory.find(&uid("healer")).await.unwrap().unwrap();
        assert!(!healer.in_service);

        let again = act(&fx, "healer", SessionAction::Reject).await.unwrap();
        assert!(!again.changed);
        assert_eq!(again.session, rejected.session);

        let end = act(&fx, "guest", SessionAction::End).await.unwrap();
        assert!(!end.changed);
    }

    #[tokio::test]
    async fn guest_cannot_acknowledge() {
        let fx = fixture().await;
        let err = act(&fx, "guest", SessionAction::Acknowledge).await.unwrap_err();
        assert_eq!(err, SessionError::NotPractitioner);
    }

    #[tokio::test]
    async fn stranger_is_not_participant() {
        let fx = fixture().await;
        let err = act(&fx, "stranger", SessionAction::End).await.unwrap_err();
        assert_eq!(err, SessionError::NotParticipant);
    }

    #[tokio::test]
    async fn users_cannot_issue_system_actions() {
        let fx = fixture().await;
        let err = act(&fx, "guest", SessionAction::TimeoutSweep).await.unwrap_err();
        assert_eq!(err, SessionError::NotParticipant);
    }

    #[tokio::test]
    async fn actions_after_waiting_deadline_end_the_session() {
        let fx = fixture_started(Timestamp::now().minus_secs(600)).await;

        let err = act(&fx, "guest", SessionAction::MarkReady).await.unwrap_err();
        assert_eq!(
            err,
            SessionError::WrongPhase {
                phase: SessionPhase::Ended,
                action: "mark_ready"
            }
        );
        let err = act(&fx, "healer", SessionAction::Accept).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::WrongPhase {
                phase: SessionPhase::Ended,
                ..
            }
        ));

        let stored = fx.sessions.find_by_id(&fx.session_id).await.unwrap().unwrap();
        assert_eq!(stored.phase(), SessionPhase::Ended);
        assert_eq!(stored.end_reason(), Some(EndReason::WaitingTimedOut));
        assert!(stored.live_started_at().is_none());
        let healer = fx.directory.find(&uid("healer")).await.unwrap().unwrap();
        assert!(!healer.in_service);
    }

    #[tokio::test]
    async fn end_after_waiting_deadline_records_the_timeout() {
        let fx = fixture_started(Timestamp::now().minus_secs(600)).await;

        let result = act(&fx, "guest", SessionAction::End).await.unwrap();

        assert!(result.changed);
        assert_eq!(result.session.end_reason(), Some(EndReason::WaitingTimedOut));
    }
}
