//! Request and response bodies for session endpoints.
//!
//! Bodies are camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::application::handlers::session::SessionView;
use crate::domain::foundation::{SessionPhase, Timestamp, UserId};
use crate::domain::participant::{Participant, ParticipantRole};
use crate::domain::session::{EndReason, PartyRole, Session, SessionAction};
use crate::ports::JoinToken;

// ════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub practitioner_id: String,
    #[serde(default)]
    pub live_seconds: Option<u64>,
}

/// One participant action, tagged by `action`.
///
/// System actions cannot be requested over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionActionRequest {
    Acknowledge,
    #[serde(alias = "ready", alias = "markReady")]
    MarkReady,
    Accept,
    Reject,
    End,
}

impl From<SessionActionRequest> for SessionAction {
    fn from(req: SessionActionRequest) -> Self {
        match req {
            SessionActionRequest::Acknowledge => SessionAction::Acknowledge,
            SessionActionRequest::MarkReady => SessionAction::MarkReady,
            SessionActionRequest::Accept => SessionAction::Accept,
            SessionActionRequest::Reject => SessionAction::Reject,
            SessionActionRequest::End => SessionAction::End,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════

/// Public profile of a session party.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResponse {
    pub id: UserId,
    pub role: ParticipantRole,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_online: bool,
    pub rating_average: Option<f64>,
    pub review_count: u32,
}

impl From<Participant> for ParticipantResponse {
    fn from(p: Participant) -> Self {
        Self {
            id: p.id,
            role: p.role,
            display_name: p.display_name,
            avatar_url: p.avatar_url,
            is_online: p.is_online,
            rating_average: p.rating_average,
            review_count: p.review_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: String,
    pub guest_id: UserId,
    pub practitioner_id: UserId,
    pub phase: SessionPhase,
    pub acknowledged_practitioner: bool,
    pub ready_guest: bool,
    pub ready_practitioner: bool,
    pub waiting_started_at: Timestamp,
    pub waiting_deadline: Timestamp,
    pub live_seconds: u64,
    pub live_started_at: Option<Timestamp>,
    pub remaining_live_seconds: Option<u64>,
    pub ended_at: Option<Timestamp>,
    pub end_reason: Option<EndReason>,
    pub channel: String,

    /// The caller's side of the session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub your_role: Option<PartyRole>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest: Option<ParticipantResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practitioner: Option<ParticipantResponse>,
    pub version: i64,
}

impl SessionResponse {
    /// Renders `session` as seen by `viewer` at `now`.
    pub fn from_session(session: &Session, viewer: &UserId, now: &Timestamp) -> Self {
        Self {
            id: session.id().to_string(),
            guest_id: session.guest_id().clone(),
            practitioner_id: session.practitioner_id().clone(),
            phase: session.phase(),
            acknowledged_practitioner: session.acknowledged_practitioner(),
            ready_guest: session.ready_guest(),
            ready_practitioner: session.ready_practitioner(),
            waiting_started_at: *session.waiting_started_at(),
            waiting_deadline: session.waiting_deadline(),
            live_seconds: session.live_seconds(),
            live_started_at: session.live_started_at().copied(),
            remaining_live_seconds: session.remaining_live_seconds(now),
            ended_at: session.ended_at().copied(),
            end_reason: session.end_reason(),
            channel: session.transport().channel.clone(),
            your_role: session.role_of(viewer),
            guest: None,
            practitioner: None,
            version: session.version(),
        }
    }

    pub fn from_view(view: SessionView, viewer: &UserId, now: &Timestamp) -> Self {
        Self {
            guest: view.guest.map(ParticipantResponse::from),
            practitioner: view.practitioner.map(ParticipantResponse::from),
            ..Self::from_session(&view.session, viewer, now)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub session: SessionResponse,

    /// False when the action changed nothing.
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListResponse {
    pub items: Vec<SessionResponse>,
    pub total: usize,
}

impl SessionListResponse {
    pub fn new(sessions: &[Session], viewer: &UserId, now: &Timestamp) -> Self {
        let items: Vec<SessionResponse> = sessions
            .iter()
            .map(|s| SessionResponse::from_session(s, viewer, now))
            .collect();
        Self {
            total: items.len(),
            items,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTokenResponse {
    pub token: String,
    pub channel: String,
    pub uid: u32,
    pub expires_at: Timestamp,
}

impl From<JoinToken> for JoinTokenResponse {
    fn from(t: JoinToken) -> Self {
        Self {
            token: t.token,
            channel: t.channel,
            uid: t.uid,
            expires_at: t.expires_at,
        }
    }
}
