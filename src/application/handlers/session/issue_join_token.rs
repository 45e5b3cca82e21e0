//! IssueJoinTokenHandler - video credentials for a participant.

use std::sync::Arc;

use tracing::debug;

use crate::domain::foundation::{CommandMetadata, SessionId, SessionPhase, Timestamp, UserId};
use crate::domain::session::{PartyRole, Session, SessionError};
use crate::ports::{JoinToken, TransportTokenIssuer};

use super::coordinator::SessionCoordinator;
use super::SessionPolicy;

#[derive(Debug, Clone)]
pub struct IssueJoinTokenCommand {
    pub session_id: SessionId,
    pub user_id: UserId,
}

pub struct IssueJoinTokenHandler {
    coordinator: Arc<SessionCoordinator>,
    issuer: Arc<dyn TransportTokenIssuer>,
    policy: SessionPolicy,
}

impl IssueJoinTokenHandler {
    pub fn new(
        coordinator: Arc<SessionCoordinator>,
        issuer: Arc<dyn TransportTokenIssuer>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            coordinator,
            issuer,
            policy,
        }
    }

    /// Issues a token bound to the caller's transport uid.
    ///
    /// # Errors
    ///
    /// - `NotParticipant` if the caller is not on the session
    /// - `WrongPhase` unless the session is live, or waiting with both
    ///   parties ready. A session past its deadline is ended first.
    pub async fn handle(&self, cmd: IssueJoinTokenCommand) -> Result<JoinToken, SessionError> {
        let session = self.coordinator.load(&cmd.session_id).await?;
        let role = session
            .role_of(&cmd.user_id)
            .ok_or(SessionError::NotParticipant)?;

        let now = Timestamp::now();
        let metadata = CommandMetadata::for_user(cmd.user_id.clone());
        let session = self
            .coordinator
            .expire_if_due(session, &self.policy, now, &metadata)
            .await?;

        if !joinable(&session) {
            return Err(SessionError::WrongPhase {
                phase: session.phase(),
                action: "issue_token",
            });
        }

        let token = self
            .issuer
            .issue(
                &session.transport().channel,
                session.transport_uid(role),
                now,
            )
            .await?;

        debug!(
            session_id = %session.id(),
            role = %role,
            uid = token.uid,
            "Join token issued"
        );
        Ok(token)
    }
}

fn joinable(session: &Session) -> bool {
    match session.phase() {
        SessionPhase::Live => true,
        SessionPhase::Waiting => {
            session.is_ready(PartyRole::Guest) && session.is_ready(PartyRole::Practitioner)
        }
        SessionPhase::Ended => false,
    }
}
