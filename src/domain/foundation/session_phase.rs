//! SessionPhase enum for tracking the lifecycle of a live session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{StateMachine, ValidationError};

/// Lifecycle phase of a session.
///
/// `waiting -> live -> ended` or `waiting -> ended`. The legacy name
/// `room_timer` is read as `Waiting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    #[serde(alias = "room_timer")]
    Waiting,
    Live,
    Ended,
}

impl SessionPhase {
    /// Storage and wire name of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Waiting => "waiting",
            SessionPhase::Live => "live",
            SessionPhase::Ended => "ended",
        }
    }

    /// Returns true until the session has ended.
    pub fn is_open(&self) -> bool {
        !matches!(self, SessionPhase::Ended)
    }

    /// Position in the lifecycle, used to assert forward-only movement.
    pub fn ordinal(&self) -> u8 {
        match self {
            SessionPhase::Waiting => 0,
            SessionPhase::Live => 1,
            SessionPhase::Ended => 2,
        }
    }
}

impl StateMachine for SessionPhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SessionPhase::*;
        matches!(
            (self, target),
            (Waiting, Live) | (Waiting, Ended) | (Live, Ended)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SessionPhase::*;
        match self {
            Waiting => vec![Live, Ended],
            Live => vec![Ended],
            Ended => vec![],
        }
    }
}

impl FromStr for SessionPhase {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" | "room_timer" => Ok(SessionPhase::Waiting),
            "live" => Ok(SessionPhase::Live),
            "ended" => Ok(SessionPhase::Ended),
            other => Err(ValidationError::invalid_format(
                "phase",
                format!("unknown session phase '{}'", other),
            )),
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
