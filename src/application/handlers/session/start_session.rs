//! StartSessionHandler - a guest requests a session with a practitioner.
//!
//! Admission runs under the practitioner lock: availability is checked,
//! the session row is inserted and the practitioner is marked in service
//! before the lock is released. The store's one-open-session constraint
//! backs the lock up across processes.

use std::sync::Arc;

use tracing::{error, info};

use crate::domain::foundation::{CommandMetadata, EventId, SessionId, Timestamp, UserId};
use crate::domain::session::{EndReason, Session, SessionError, SessionPatch, SessionRequested};

use super::coordinator::{envelope_for, SessionCoordinator};
use super::SessionPolicy;

/// Command to start a session.
#[derive(Debug, Clone)]
pub struct StartSessionCommand {
    pub guest_id: UserId,
    pub practitioner_id: UserId,

    /// Requested live duration. `None` uses the configured default.
    pub live_seconds: Option<u64>,
}

/// Result of a successful start.
#[derive(Debug, Clone)]
pub struct StartSessionResult {
    pub session: Session,
}

pub struct StartSessionHandler {
    coordinator: Arc<SessionCoordinator>,
    policy: SessionPolicy,
}

impl StartSessionHandler {
    pub fn new(coordinator: Arc<SessionCoordinator>, policy: SessionPolicy) -> Self {
        Self {
            coordinator,
            policy,
        }
    }

    pub async fn handle(
        &self,
        cmd: StartSessionCommand,
        metadata: CommandMetadata,
    ) -> Result<StartSessionResult, SessionError> {
        // 1. Caller must be a guest
        let caller = self
            .coordinator
            .directory()
            .find(&cmd.guest_id)
            .await?
            .ok_or_else(|| SessionError::role_mismatch("caller has no participant record"))?;
        if !caller.is_guest() {
            return Err(SessionError::role_mismatch("only guests can start sessions"));
        }

        if cmd.guest_id == cmd.practitioner_id {
            return Err(SessionError::validation(
                "practitioner_id",
                "cannot start a session with yourself",
            ));
        }
        let live_seconds = self.policy.live_seconds(cmd.live_seconds)?;

        // 2. Admit under the practitioner lock
        let lease = self.coordinator.lock_practitioner(&cmd.practitioner_id).await?;
        let admitted = self.admit(&cmd, live_seconds).await;
        self.coordinator.unlock(lease).await;
        let session = admitted?;

        info!(
            session_id = %session.id(),
            guest_id = %session.guest_id(),
            practitioner_id = %session.practitioner_id(),
            live_seconds,
            "Session requested"
        );

        // 3. Publish
        let event = SessionRequested {
            event_id: EventId::new(),
            session_id: *session.id(),
            guest_id: session.guest_id().clone(),
            practitioner_id: session.practitioner_id().clone(),
            live_seconds,
            requested_at: *session.created_at(),
        };
        self.coordinator
            .publish(envelope_for(&event).into_iter().collect(), &metadata)
            .await;

        Ok(StartSessionResult { session })
    }

    async fn admit(
        &self,
        cmd: &StartSessionCommand,
        live_seconds: u64,
    ) -> Result<Session, SessionError> {
        let directory = self.coordinator.directory();
        let sessions = self.coordinator.sessions();

        let practitioner = directory
            .find(&cmd.practitioner_id)
            .await?
            .filter(|p| p.is_practitioner())
            .ok_or_else(|| SessionError::PractitionerNotFound(cmd.practitioner_id.clone()))?;

        if !practitioner.is_available() {
            return Err(SessionError::PractitionerUnavailable);
        }
        if !sessions
            .find_open_by_practitioner(&cmd.practitioner_id)
            .await?
            .is_empty()
        {
            return Err(SessionError::PractitionerUnavailable);
        }

        let now = Timestamp::now();
        let session = Session::new(
            SessionId::new(),
            cmd.guest_id.clone(),
            cmd.practitioner_id.clone(),
            self.policy.waiting_timeout_secs,
            live_seconds,
            now,
        )?;
        sessions.insert(&session).await?;

        if let Err(err) = directory.set_in_service(&cmd.practitioner_id, true).await {
            self.compensate(&session, now).await;
            return Err(err.into());
        }

        Ok(session)
    }

    /// Ends a session whose practitioner could not be marked in service.
    async fn compensate(&self, session: &Session, now: Timestamp) {
        let ended = session.apply(&SessionPatch::end(EndReason::Rejected, now), now);
        let outcome = match ended {
            Ok(next) => self
                .coordinator
                .sessions()
                .update_if_version(&next, session.version())
                .await
                .map_err(SessionError::from),
            Err(err) => Err(err.into()),
        };

        match outcome {
            Ok(true) => {}
            Ok(false) => error!(
                session_id = %session.id(),
                "Admission compensation lost a race; sweep will end the session"
            ),
            Err(err) => error!(
                session_id = %session.id(),
                error = %err,
                "Admission compensation failed; sweep will end the session"
            ),
        }
    }
}
