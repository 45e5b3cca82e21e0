//! SweepTimeoutsHandler - ends abandoned sessions and repairs presence.
//!
//! One pass ends waiting sessions past their deadline, ends live sessions
//! past their countdown plus grace, then recomputes `in_service` for every
//! practitioner still flagged. Each session goes through the ordinary
//! transition path, so a pass racing a participant's `end` or another
//! sweep is harmless.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::domain::foundation::{CommandMetadata, SessionId, SessionPhase, Timestamp, UserId};
use crate::domain::session::{Actor, Session, SessionAction, SessionError};

use super::coordinator::SessionCoordinator;
use super::SessionPolicy;

/// Sessions transitioned concurrently within one pass.
const SWEEP_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct SweepTimeoutsCommand {
    pub now: Timestamp,
}

/// What one pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Sessions this pass ended.
    pub ended: Vec<SessionId>,

    /// Practitioners whose stale `in_service` flag was cleared.
    pub reconciled: Vec<UserId>,
}

pub struct SweepTimeoutsHandler {
    coordinator: Arc<SessionCoordinator>,
    policy: SessionPolicy,
}

impl SweepTimeoutsHandler {
    pub fn new(coordinator: Arc<SessionCoordinator>, policy: SessionPolicy) -> Self {
        Self {
            coordinator,
            policy,
        }
    }

    /// Runs one pass.
    ///
    /// # Errors
    ///
    /// Only listing the candidates can fail the pass. Failures on single
    /// sessions or practitioners are logged and left for the next pass.
    pub async fn handle(
        &self,
        cmd: SweepTimeoutsCommand,
        metadata: CommandMetadata,
    ) -> Result<SweepReport, SessionError> {
        let now = cmd.now;
        let sessions = self.coordinator.sessions();

        let mut due: Vec<(SessionId, SessionAction)> = sessions
            .find_by_phase(SessionPhase::Waiting)
            .await?
            .into_iter()
            .filter(|s| s.is_waiting_expired(&now))
            .map(|s| (*s.id(), SessionAction::TimeoutSweep))
            .collect();

        let grace_secs = self.policy.live_overrun_grace_secs;
        due.extend(
            sessions
                .find_by_phase(SessionPhase::Live)
                .await?
                .into_iter()
                .filter(|s| overran(s, &now, grace_secs))
                .map(|s| (*s.id(), SessionAction::CountdownElapsed { grace_secs })),
        );

        let mut ended: Vec<SessionId> = stream::iter(due)
            .map(|(id, action)| self.end_one(id, action, now, &metadata))
            .buffer_unordered(SWEEP_CONCURRENCY)
            .filter_map(|ended| async move { ended })
            .collect()
            .await;
        ended.sort();

        let reconciled = self.reconcile().await?;

        if !ended.is_empty() || !reconciled.is_empty() {
            info!(
                ended = ended.len(),
                reconciled = reconciled.len(),
                correlation_id = metadata.correlation_id(),
                "Timeout sweep changed state"
            );
        }

        Ok(SweepReport { ended, reconciled })
    }

    async fn end_one(
        &self,
        id: SessionId,
        action: SessionAction,
        now: Timestamp,
        metadata: &CommandMetadata,
    ) -> Option<SessionId> {
        match self
            .coordinator
            .transition(&id, &Actor::System, action, now, metadata)
            .await
        {
            Ok(transition) if transition.ended_session() => Some(id),
            Ok(_) => None,
            Err(err) => {
                warn!(session_id = %id, action = action.as_str(), error = %err, "Sweep could not end session");
                None
            }
        }
    }

    /// Clears `in_service` for practitioners with no open session left.
    async fn reconcile(&self) -> Result<Vec<UserId>, SessionError> {
        let flagged = self.coordinator.directory().list_in_service().await?;
        let mut reconciled = Vec::new();

        for practitioner_id in flagged {
            match self.coordinator.release_practitioner(&practitioner_id).await {
                Ok(false) => reconciled.push(practitioner_id),
                Ok(true) => {}
                Err(err) => warn!(
                    practitioner_id = %practitioner_id,
                    error = %err,
                    "Sweep could not reconcile practitioner"
                ),
            }
        }

        Ok(reconciled)
    }
}

fn overran(session: &Session, now: &Timestamp, grace_secs: u64) -> bool {
    session
        .live_deadline()
        .map(|deadline| now.is_after(&deadline.plus_secs(grace_secs)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::locks::InProcessKeyedLock;
    use crate::adapters::memory::{InMemoryParticipantDirectory, InMemorySessionRepository};
    use crate::domain::participant::Participant;
    use crate::domain::session::{EndReason, SessionPatch};
    use crate::ports::{ParticipantDirectory, SessionRepository};

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn t0() -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000)
    }

    struct Fixture {
        sessions: Arc<InMemorySessionRepository>,
        directory: Arc<InMemoryParticipantDirectory>,
        handler: SweepTimeoutsHandler,
    }

    fn fixture() -> Fixture {
        let sessions = Arc::new(InMemorySessionRepository::new());
        let directory = Arc::new(InMemoryParticipantDirectory::with_participants([
            Participant::guest(uid("guest")),
            Participant::practitioner(uid("healer")).online(),
            Participant::practitioner(uid("healer-2")).online(),
        ]));
        let coordinator = Arc::new(SessionCoordinator::new(
            sessions.clone(),
            directory.clone(),
            Arc::new(InProcessKeyedLock::default()),
            Arc::new(InMemoryEventBus::new()),
        ));
        Fixture {
            sessions,
            directory,
            handler: SweepTimeoutsHandler::new(coordinator, SessionPolicy::default()),
        }
    }

    async fn waiting_for(fx: &Fixture, practitioner: &str) -> Session {
        let session =
            Session::new(SessionId::new(), uid("guest"), uid(practitioner), 120, 900, t0()).unwrap();
        fx.sessions.insert(&session).await.unwrap();
        fx.directory.set_in_service(&uid(practitioner), true).await.unwrap();
        session
    }

    async fn sweep(fx: &Fixture, now: Timestamp) -> SweepReport {
        fx.handler
            .handle(SweepTimeoutsCommand { now }, CommandMetadata::system("test"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn expired_waiting_session_is_ended_and_practitioner_released() {
        let fx = fixture();
        let session = waiting_for(&fx, "healer").await;

        let report = sweep(&fx, t0().plus_secs(121)).await;

        assert_eq!(report.ended, vec![*session.id()]);
        let stored = fx.sessions.find_by_id(session.id()).await.unwrap().unwrap();
        assert_eq!(stored.end_reason(), Some(EndReason::WaitingTimedOut));
        let healer = fx.directory.find(&uid("healer")).await.unwrap().unwrap();
        assert!(!healer.in_service);
    }

    #[tokio::test]
    async fn second_sweep_is_a_no_op() {
        let fx = fixture();
        waiting_for(&fx, "healer").await;

        sweep(&fx, t0().plus_secs(121)).await;
        let again = sweep(&fx, t0().plus_secs(122)).await;

        assert_eq!(again, SweepReport::default());
    }

    #[tokio::test]
    async fn session_at_deadline_is_kept() {
        let fx = fixture();
        waiting_for(&fx, "healer").await;

        let report = sweep(&fx, t0().plus_secs(120)).await;

        assert!(report.ended.is_empty());
        let healer = fx.directory.find(&uid("healer")).await.unwrap().unwrap();
        assert!(healer.in_service);
    }

    #[tokio::test]
    async fn overrun_live_session_is_ended_after_grace() {
        let fx = fixture();
        let session = waiting_for(&fx, "healer").await;
        let live_at = t0().plus_secs(10);
        let live = session
            .apply(
                &SessionPatch {
                    phase: Some(SessionPhase::Live),
                    acknowledged_practitioner: Some(true),
                    ready_guest: Some(true),
                    ready_practitioner: Some(true),
                    live_started_at: Some(live_at),
                    ..SessionPatch::default()
                },
                live_at,
            )
            .unwrap();
        assert!(fx.sessions.update_if_version(&live, session.version()).await.unwrap());

        let within_grace = sweep(&fx, live_at.plus_secs(900 + 120)).await;
        assert!(within_grace.ended.is_empty());

        let past_grace = sweep(&fx, live_at.plus_secs(900 + 121)).await;
        assert_eq!(past_grace.ended, vec![*session.id()]);
        let stored = fx.sessions.find_by_id(session.id()).await.unwrap().unwrap();
        assert_eq!(stored.end_reason(), Some(EndReason::CountdownElapsed));
    }

    #[tokio::test]
    async fn stale_in_service_flag_is_reconciled() {
        let fx = fixture();
        fx.directory.set_in_service(&uid("healer-2"), true).await.unwrap();

        let report = sweep(&fx, t0()).await;

        assert_eq!(report.reconciled, vec![uid("healer-2")]);
        let healer = fx.directory.find(&uid("healer-2")).await.unwrap().unwrap();
        assert!(!healer.in_service);
    }

    #[tokio::test]
    async fn concurrent_sweeps_end_each_session_once() {
        let fx = fixture();
        let first = waiting_for(&fx, "healer").await;
        let second = waiting_for(&fx, "healer-2").await;
        let now = t0().plus_secs(500);

        let (a, b) = tokio::join!(sweep(&fx, now), sweep(&fx, now));

        let mut all: Vec<SessionId> = a.ended.into_iter().chain(b.ended).collect();
        all.sort();
        let mut expected = vec![*first.id(), *second.id()];
        expected.sort();
        assert_eq!(all, expected);
    }
}
