//! Session aggregate entity.
//!
//! A session is created by a guest against one practitioner. The
//! aggregate itself never decides whether a transition is legal; that is
//! [`super::decide`]. It only applies patches, refusing any that would
//! move the phase backwards or clear a readiness flag.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    DomainError, ErrorCode, SessionId, SessionPhase, StateMachine, Timestamp, UserId,
    ValidationError,
};

use super::{PartyRole, SessionPatch, TransportBinding};

/// Why a session reached `ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Rejected,
    EndedByGuest,
    EndedByPractitioner,
    WaitingTimedOut,
    CountdownElapsed,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Rejected => "rejected",
            EndReason::EndedByGuest => "ended_by_guest",
            EndReason::EndedByPractitioner => "ended_by_practitioner",
            EndReason::WaitingTimedOut => "waiting_timed_out",
            EndReason::CountdownElapsed => "countdown_elapsed",
        }
    }

    pub fn ended_by(role: PartyRole) -> Self {
        match role {
            PartyRole::Guest => EndReason::EndedByGuest,
            PartyRole::Practitioner => EndReason::EndedByPractitioner,
        }
    }
}

impl FromStr for EndReason {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rejected" => Ok(EndReason::Rejected),
            "ended_by_guest" => Ok(EndReason::EndedByGuest),
            "ended_by_practitioner" => Ok(EndReason::EndedByPractitioner),
            "waiting_timed_out" => Ok(EndReason::WaitingTimedOut),
            "countdown_elapsed" => Ok(EndReason::CountdownElapsed),
            other => Err(ValidationError::invalid_format(
                "end_reason",
                format!("unknown end reason '{}'", other),
            )),
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session aggregate.
///
/// # Invariants
///
/// - `guest_id != practitioner_id`, both immutable
/// - `phase` only moves forward
/// - `live_started_at` is set iff phase is `live` or later (and the session
///   went live before ending)
/// - readiness flags never go from true back to false
/// - `version` increases by one on every applied, non-empty patch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    guest_id: UserId,
    practitioner_id: UserId,
    phase: SessionPhase,

    acknowledged_practitioner: bool,
    ready_guest: bool,
    ready_practitioner: bool,

    waiting_started_at: Timestamp,
    waiting_seconds: u64,
    live_seconds: u64,
    live_started_at: Option<Timestamp>,
    ended_at: Option<Timestamp>,
    end_reason: Option<EndReason>,

    transport: TransportBinding,
    version: i64,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Session {
    /// Creates a session in `waiting` with every flag cleared.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` if guest and practitioner are the same user
    /// - `OutOfRange` if either duration is zero
    pub fn new(
        id: SessionId,
        guest_id: UserId,
        practitioner_id: UserId,
        waiting_seconds: u64,
        live_seconds: u64,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        if guest_id == practitioner_id {
            return Err(ValidationError::invalid_format(
                "practitioner_id",
                "guest and practitioner must be different users",
            ));
        }
        if waiting_seconds == 0 {
            return Err(ValidationError::out_of_range(
                "waiting_seconds",
                1,
                i64::MAX,
                0,
            ));
        }
        if live_seconds == 0 {
            return Err(ValidationError::out_of_range("live_seconds", 1, i64::MAX, 0));
        }

        let transport = TransportBinding::for_session(&id);
        Ok(Self {
            id,
            guest_id,
            practitioner_id,
            phase: SessionPhase::Waiting,
            acknowledged_practitioner: false,
            ready_guest: false,
            ready_practitioner: false,
            waiting_started_at: now,
            waiting_seconds,
            live_seconds,
            live_started_at: None,
            ended_at: None,
            end_reason: None,
            transport,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstitute a session from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: SessionId,
        guest_id: UserId,
        practitioner_id: UserId,
        phase: SessionPhase,
        acknowledged_practitioner: bool,
        ready_guest: bool,
        ready_practitioner: bool,
        waiting_started_at: Timestamp,
        waiting_seconds: u64,
        live_seconds: u64,
        live_started_at: Option<Timestamp>,
        ended_at: Option<Timestamp>,
        end_reason: Option<EndReason>,
        transport: TransportBinding,
        version: i64,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            guest_id,
            practitioner_id,
            phase,
            acknowledged_practitioner,
            ready_guest,
            ready_practitioner,
            waiting_started_at,
            waiting_seconds,
            live_seconds,
            live_started_at,
            ended_at,
            end_reason,
            transport,
            version,
            created_at,
            updated_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn guest_id(&self) -> &UserId {
        &self.guest_id
    }

    pub fn practitioner_id(&self) -> &UserId {
        &self.practitioner_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn acknowledged_practitioner(&self) -> bool {
        self.acknowledged_practitioner
    }

    pub fn ready_guest(&self) -> bool {
        self.ready_guest
    }

    pub fn ready_practitioner(&self) -> bool {
        self.ready_practitioner
    }

    /// Readiness flag of the given side.
    pub fn is_ready(&self, role: PartyRole) -> bool {
        match role {
            PartyRole::Guest => self.ready_guest,
            PartyRole::Practitioner => self.ready_practitioner,
        }
    }

    pub fn waiting_started_at(&self) -> &Timestamp {
        &self.waiting_started_at
    }

    pub fn waiting_seconds(&self) -> u64 {
        self.waiting_seconds
    }

    pub fn live_seconds(&self) -> u64 {
        self.live_seconds
    }

    pub fn live_started_at(&self) -> Option<&Timestamp> {
        self.live_started_at.as_ref()
    }

    pub fn ended_at(&self) -> Option<&Timestamp> {
        self.ended_at.as_ref()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn transport(&self) -> &TransportBinding {
        &self.transport
    }

    /// Optimistic concurrency token compared by the store.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Derived timing
    // ─────────────────────────────────────────────────────────────────────────

    /// When the waiting room expires.
    pub fn waiting_deadline(&self) -> Timestamp {
        self.waiting_started_at.plus_secs(self.waiting_seconds)
    }

    /// When the live countdown reaches zero, once live.
    pub fn live_deadline(&self) -> Option<Timestamp> {
        self.live_started_at
            .map(|started| started.plus_secs(self.live_seconds))
    }

    /// True when the session is waiting and its deadline has passed.
    pub fn is_waiting_expired(&self, now: &Timestamp) -> bool {
        self.phase == SessionPhase::Waiting && now.is_after(&self.waiting_deadline())
    }

    /// Seconds left on the live countdown. `None` unless live.
    pub fn remaining_live_seconds(&self, now: &Timestamp) -> Option<u64> {
        if self.phase != SessionPhase::Live {
            return None;
        }
        self.live_deadline()
            .map(|deadline| deadline.secs_since(now))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authorization
    // ─────────────────────────────────────────────────────────────────────────

    /// Which side of the session the user is on, if any.
    pub fn role_of(&self, user_id: &UserId) -> Option<PartyRole> {
        if &self.guest_id == user_id {
            Some(PartyRole::Guest)
        } else if &self.practitioner_id == user_id {
            Some(PartyRole::Practitioner)
        } else {
            None
        }
    }

    pub fn is_participant(&self, user_id: &UserId) -> bool {
        self.role_of(user_id).is_some()
    }

    /// Transport uid of the given side.
    pub fn transport_uid(&self, role: PartyRole) -> u32 {
        match role {
            PartyRole::Guest => self.transport.guest_uid,
            PartyRole::Practitioner => self.transport.practitioner_uid,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the session with `patch` applied and the version bumped.
    ///
    /// An empty patch returns an unchanged copy.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` if the patch moves the phase backwards
    ///   or clears a readiness flag
    pub fn apply(&self, patch: &SessionPatch, now: Timestamp) -> Result<Session, DomainError> {
        if patch.is_empty() {
            return Ok(self.clone());
        }

        let mut next = self.clone();

        if let Some(target) = patch.phase {
            if target != self.phase {
                next.phase = self.phase.transition_to(target).map_err(|e| {
                    DomainError::new(ErrorCode::InvalidStateTransition, e.to_string())
                        .with_detail("session_id", self.id.to_string())
                })?;
            }
        }

        next.acknowledged_practitioner = monotonic_flag(
            "acknowledged_practitioner",
            self.acknowledged_practitioner,
            patch.acknowledged_practitioner,
        )?;
        next.ready_guest = monotonic_flag("ready_guest", self.ready_guest, patch.ready_guest)?;
        next.ready_practitioner = monotonic_flag(
            "ready_practitioner",
            self.ready_practitioner,
            patch.ready_practitioner,
        )?;

        if let Some(at) = patch.live_started_at {
            next.live_started_at = Some(at);
        }
        if let Some(at) = patch.ended_at {
            next.ended_at = Some(at);
        }
        if let Some(reason) = patch.end_reason {
            next.end_reason = Some(reason);
        }

        if next.phase == SessionPhase::Live && next.live_started_at.is_none() {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Session cannot go live without a start time",
            )
            .with_detail("session_id", self.id.to_string()));
        }

        next.version = self.version + 1;
        next.updated_at = now;
        Ok(next)
    }
}

fn monotonic_flag(field: &str, current: bool, requested: Option<bool>) -> Result<bool, DomainError> {
    match requested {
        Some(false) if current => Err(DomainError::new(
            ErrorCode::InvalidStateTransition,
            format!("Readiness flag '{}' cannot be cleared", field),
        )),
        Some(value) => Ok(value || current),
        None => Ok(current),
    }
}
