//! SessionCoordinator - the write path shared by every session handler.
//!
//! A transition takes the `session:<id>` lock, runs the pure state machine
//! against the persisted row and writes the patch with compare-and-set on
//! the session version. Losing the compare-and-set re-reads the row and
//! decides again. When the write ends the session, the practitioner's
//! `in_service` flag is recomputed from persisted state under the
//! `practitioner:<id>` lock. The two locks are never held together.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, warn};

use crate::domain::foundation::{
    CommandMetadata, DomainEvent, EventEnvelope, EventId, SessionId, SessionPhase, Timestamp,
    UserId,
};
use crate::domain::session::{
    decide, Actor, EndReason, ParticipantReady, PartyRole, PractitionerAcknowledged, Session,
    SessionAction, SessionEnded, SessionError, SessionPatch, SessionWentLive,
};
use crate::ports::{
    practitioner_lock_key, session_lock_key, EventPublisher, KeyedLock, LockLease,
    ParticipantDirectory, SessionRepository,
};

use super::SessionPolicy;

/// Compare-and-set attempts before a transition gives up with `Conflict`.
pub const MAX_CAS_ATTEMPTS: usize = 5;

/// Outcome of one transition.
#[derive(Debug, Clone)]
pub struct Transition {
    /// The session as read before the patch.
    pub previous: Session,

    /// The session as persisted afterwards (unchanged for a no-op).
    pub session: Session,

    pub patch: SessionPatch,
}

impl Transition {
    /// True when this call wrote a change.
    pub fn applied(&self) -> bool {
        !self.patch.is_empty()
    }

    /// True when this call is the one that ended the session.
    pub fn ended_session(&self) -> bool {
        self.applied() && self.patch.ends_session()
    }

    /// True when this call found the waiting deadline passed and ended the
    /// session as timed out.
    pub fn timed_out_waiting(&self) -> bool {
        self.ended_session() && self.patch.end_reason == Some(EndReason::WaitingTimedOut)
    }
}

/// Serializes and persists session transitions.
pub struct SessionCoordinator {
    sessions: Arc<dyn SessionRepository>,
    directory: Arc<dyn ParticipantDirectory>,
    locks: Arc<dyn KeyedLock>,
    publisher: Arc<dyn EventPublisher>,
}

impl SessionCoordinator {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        directory: Arc<dyn ParticipantDirectory>,
        locks: Arc<dyn KeyedLock>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            sessions,
            directory,
            locks,
            publisher,
        }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionRepository> {
        &self.sessions
    }

    pub fn directory(&self) -> &Arc<dyn ParticipantDirectory> {
        &self.directory
    }

    /// Loads a session or fails with `NotFound`.
    pub async fn load(&self, id: &SessionId) -> Result<Session, SessionError> {
        self.sessions
            .find_by_id(id)
            .await?
            .ok_or_else(|| SessionError::not_found(*id))
    }

    /// Applies `action` by `actor` to the session and persists the result.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session does not exist
    /// - the state machine's rejection, unchanged
    /// - `WrongPhase { phase: Ended }` when a participant's non-terminal
    ///   action arrives after the waiting deadline; the timeout is still
    ///   persisted
    /// - `Conflict` if the lock could not be taken or every
    ///   compare-and-set attempt lost
    pub async fn transition(
        &self,
        id: &SessionId,
        actor: &Actor,
        action: SessionAction,
        now: Timestamp,
        metadata: &CommandMetadata,
    ) -> Result<Transition, SessionError> {
        let lease = self.locks.acquire(&session_lock_key(id)).await?;
        let outcome = self.transition_locked(id, actor, action, now).await;
        self.unlock(lease).await;
        let transition = outcome?;

        if transition.ended_session() {
            let practitioner_id = transition.session.practitioner_id().clone();
            if let Err(err) = self.release_practitioner(&practitioner_id).await {
                error!(
                    session_id = %id,
                    practitioner_id = %practitioner_id,
                    error = %err,
                    "Session ended but practitioner release failed; sweep will reconcile"
                );
            }
        }

        if transition.applied() {
            debug!(
                session_id = %id,
                action = action.as_str(),
                phase = %transition.session.phase(),
                version = transition.session.version(),
                "Session transition persisted"
            );
            self.publish(lifecycle_events(&transition), metadata).await;
        }

        if transition.timed_out_waiting() && !action.is_system() && !action.is_termination() {
            return Err(SessionError::WrongPhase {
                phase: SessionPhase::Ended,
                action: action.as_str(),
            });
        }

        Ok(transition)
    }

    /// Ends `session` if its waiting deadline, or its live countdown plus
    /// grace, has passed. Returns the row as persisted afterwards.
    pub async fn expire_if_due(
        &self,
        session: Session,
        policy: &SessionPolicy,
        now: Timestamp,
        metadata: &CommandMetadata,
    ) -> Result<Session, SessionError> {
        let action = match session.phase() {
            SessionPhase::Waiting if session.is_waiting_expired(&now) => SessionAction::TimeoutSweep,
            SessionPhase::Live if countdown_overrun(&session, &now, policy) => {
                SessionAction::CountdownElapsed {
                    grace_secs: policy.live_overrun_grace_secs,
                }
            }
            _ => return Ok(session),
        };

        let transition = self
            .transition(session.id(), &Actor::System, action, now, metadata)
            .await?;
        Ok(transition.session)
    }

    async fn transition_locked(
        &self,
        id: &SessionId,
        actor: &Actor,
        action: SessionAction,
        now: Timestamp,
    ) -> Result<Transition, SessionError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let previous = self.load(id).await?;
            let patch = decide(&previous, actor, action, now)?;

            if patch.is_empty() {
                return Ok(Transition {
                    session: previous.clone(),
                    previous,
                    patch,
                });
            }

            let next = previous.apply(&patch, now)?;
            if self
                .sessions
                .update_if_version(&next, previous.version())
                .await?
            {
                return Ok(Transition {
                    previous,
                    session: next,
                    patch,
                });
            }

            debug!(
                session_id = %id,
                attempt,
                "Session version moved underneath transition, retrying"
            );
        }

        warn!(session_id = %id, action = action.as_str(), "Transition gave up after repeated conflicts");
        Err(SessionError::conflict(format!(
            "session {} kept changing; re-fetch and retry",
            id
        )))
    }

    /// Recomputes the practitioner's `in_service` flag from persisted
    /// sessions and stores it. Returns the new value.
    pub async fn release_practitioner(&self, practitioner_id: &UserId) -> Result<bool, SessionError> {
        let lease = self
            .locks
            .acquire(&practitioner_lock_key(practitioner_id))
            .await?;
        let outcome = self.recompute_in_service(practitioner_id).await;
        self.unlock(lease).await;
        outcome
    }

    async fn recompute_in_service(&self, practitioner_id: &UserId) -> Result<bool, SessionError> {
        let open = self
            .sessions
            .find_open_by_practitioner(practitioner_id)
            .await?;
        let in_service = !open.is_empty();
        self.directory
            .set_in_service(practitioner_id, in_service)
            .await?;
        Ok(in_service)
    }

    /// Takes the practitioner lock for admission or presence changes.
    pub async fn lock_practitioner(&self, practitioner_id: &UserId) -> Result<LockLease, SessionError> {
        Ok(self
            .locks
            .acquire(&practitioner_lock_key(practitioner_id))
            .await?)
    }

    /// Releases a lease. A failed release is logged; the lease expires on
    /// its own.
    pub async fn unlock(&self, lease: LockLease) {
        let key = lease.key().to_string();
        if let Err(err) = self.locks.release(lease).await {
            warn!(lock_key = %key, error = %err, "Failed to release lock");
        }
    }

    /// Publishes envelopes built from `events`. Publishing never fails the
    /// caller; the state change is already persisted.
    pub async fn publish(&self, events: Vec<EventEnvelope>, metadata: &CommandMetadata) {
        if events.is_empty() {
            return;
        }

        let envelopes = events
            .into_iter()
            .map(|envelope| {
                let envelope = envelope.with_correlation_id(metadata.correlation_id());
                match metadata.user_id() {
                    Some(user_id) => envelope.with_user_id(user_id.as_str()),
                    None => envelope,
                }
            })
            .collect();

        if let Err(err) = self.publisher.publish_all(envelopes).await {
            warn!(
                correlation_id = metadata.correlation_id(),
                error = %err,
                "Failed to publish session events"
            );
        }
    }
}

fn countdown_overrun(session: &Session, now: &Timestamp, policy: &SessionPolicy) -> bool {
    session
        .live_deadline()
        .map(|deadline| now.is_after(&deadline.plus_secs(policy.live_overrun_grace_secs)))
        .unwrap_or(false)
}

/// Wraps an event in an envelope, logging events that cannot be serialized.
pub(crate) fn envelope_for<T>(event: &T) -> Option<EventEnvelope>
where
    T: DomainEvent + Serialize,
{
    match EventEnvelope::from_event(event) {
        Ok(envelope) => Some(envelope),
        Err(err) => {
            error!(event_type = event.event_type(), error = %err, "Failed to build event envelope");
            None
        }
    }
}

/// Events describing what a persisted patch changed.
fn lifecycle_events(transition: &Transition) -> Vec<EventEnvelope> {
    let Transition {
        previous,
        session,
        patch,
    } = transition;
    let at = *session.updated_at();
    let mut events = Vec::new();

    if patch.acknowledged_practitioner == Some(true) && !previous.acknowledged_practitioner() {
        events.extend(envelope_for(&PractitionerAcknowledged {
            event_id: EventId::new(),
            session_id: *session.id(),
            practitioner_id: session.practitioner_id().clone(),
            acknowledged_at: at,
        }));
    }

    for role in [PartyRole::Guest, PartyRole::Practitioner] {
        if session.is_ready(role) && !previous.is_ready(role) {
            events.extend(envelope_for(&ParticipantReady {
                event_id: EventId::new(),
                session_id: *session.id(),
                role,
                ready_at: at,
            }));
        }
    }

    if patch.goes_live() {
        events.extend(envelope_for(&SessionWentLive {
            event_id: EventId::new(),
            session_id: *session.id(),
            channel: session.transport().channel.clone(),
            live_seconds: session.live_seconds(),
            live_started_at: session.live_started_at().copied().unwrap_or(at),
        }));
    }

    if patch.ends_session() {
        if let Some(reason) = session.end_reason() {
            events.extend(envelope_for(&SessionEnded {
                event_id: EventId::new(),
                session_id: *session.id(),
                practitioner_id: session.practitioner_id().clone(),
                reason,
                ended_at: session.ended_at().copied().unwrap_or(at),
            }));
        }
    }

    events
}
