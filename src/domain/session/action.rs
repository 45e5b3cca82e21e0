//! Actions that drive the session state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::UserId;

/// A requested transition.
///
/// `TimeoutSweep` and `CountdownElapsed` are system actions; the rest are
/// issued by a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionAction {
    Acknowledge,
    MarkReady,
    Accept,
    Reject,
    End,
    TimeoutSweep,
    /// Ends a live session once its countdown plus `grace_secs` has passed.
    CountdownElapsed { grace_secs: u64 },
}

impl SessionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionAction::Acknowledge => "acknowledge",
            SessionAction::MarkReady => "mark_ready",
            SessionAction::Accept => "accept",
            SessionAction::Reject => "reject",
            SessionAction::End => "end",
            SessionAction::TimeoutSweep => "timeout_sweep",
            SessionAction::CountdownElapsed { .. } => "countdown_elapsed",
        }
    }

    /// `Reject` and `End` ask for the session to end.
    pub fn is_termination(&self) -> bool {
        matches!(self, SessionAction::Reject | SessionAction::End)
    }

    pub fn is_system(&self) -> bool {
        matches!(
            self,
            SessionAction::TimeoutSweep | SessionAction::CountdownElapsed { .. }
        )
    }
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is issuing an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Actor {
    User(UserId),
    System,
}

impl Actor {
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Actor::User(id) => Some(id),
            Actor::System => None,
        }
    }
}

impl From<UserId> for Actor {
    fn from(id: UserId) -> Self {
        Actor::User(id)
    }
}

/// The side of a session a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Guest,
    Practitioner,
}

impl PartyRole {
    pub fn other(&self) -> Self {
        match self {
            PartyRole::Guest => PartyRole::Practitioner,
            PartyRole::Practitioner => PartyRole::Guest,
        }
    }
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartyRole::Guest => f.write_str("guest"),
            PartyRole::Practitioner => f.write_str("practitioner"),
        }
    }
}
