//! Session domain events.
//!
//! - `SessionRequested` - guest opened a session against a practitioner
//! - `PractitionerAcknowledged` - practitioner saw the request
//! - `ParticipantReady` - one side confirmed readiness
//! - `SessionWentLive` - both sides ready, countdown started
//! - `SessionEnded` - terminal, with the reason

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{domain_event, EventId, SessionId, Timestamp, UserId};

use super::{EndReason, PartyRole};

// ════════════════════════════════════════════════════════════════════════════
// SessionRequested
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequested {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub guest_id: UserId,
    pub practitioner_id: UserId,
    pub live_seconds: u64,
    pub requested_at: Timestamp,
}

domain_event!(
    SessionRequested,
    event_type = "session.requested.v1",
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = requested_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// PractitionerAcknowledged
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PractitionerAcknowledged {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub practitioner_id: UserId,
    pub acknowledged_at: Timestamp,
}

domain_event!(
    PractitionerAcknowledged,
    event_type = "session.acknowledged.v1",
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = acknowledged_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// ParticipantReady
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantReady {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub role: PartyRole,
    pub ready_at: Timestamp,
}

domain_event!(
    ParticipantReady,
    event_type = "session.participant_ready.v1",
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = ready_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SessionWentLive
// ════════════════════════════════════════════════════════════════════════════

/// Published exactly once per session, by the writer that flipped it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionWentLive {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub channel: String,
    pub live_seconds: u64,
    pub live_started_at: Timestamp,
}

domain_event!(
    SessionWentLive,
    event_type = "session.went_live.v1",
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = live_started_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SessionEnded
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEnded {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub practitioner_id: UserId,
    pub reason: EndReason,
    pub ended_at: Timestamp,
}

domain_event!(
    SessionEnded,
    event_type = "session.ended.v1",
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = ended_at,
    event_id = event_id
);
