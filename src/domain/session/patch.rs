//! Field-level change set produced by the state machine.

use crate::domain::foundation::{SessionPhase, Timestamp};

use super::EndReason;

/// Fields to change on a session. `None` leaves a field as it is.
///
/// An empty patch is an accepted no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub phase: Option<SessionPhase>,
    pub acknowledged_practitioner: Option<bool>,
    pub ready_guest: Option<bool>,
    pub ready_practitioner: Option<bool>,
    pub live_started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub end_reason: Option<EndReason>,
}

impl SessionPatch {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A patch that terminates the session.
    pub fn end(reason: EndReason, now: Timestamp) -> Self {
        Self {
            phase: Some(SessionPhase::Ended),
            ended_at: Some(now),
            end_reason: Some(reason),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// True when applying this patch moves the session to `ended`.
    pub fn ends_session(&self) -> bool {
        self.phase == Some(SessionPhase::Ended)
    }

    /// True when applying this patch moves the session to `live`.
    pub fn goes_live(&self) -> bool {
        self.phase == Some(SessionPhase::Live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_patch_is_empty() {
        assert!(SessionPatch::empty().is_empty());
        assert!(!SessionPatch::empty().ends_session());
    }

    #[test]
    fn end_patch_sets_reason_and_time() {
        let now = Timestamp::from_unix_secs(1_700_000_000);
        let patch = SessionPatch::end(EndReason::Rejected, now);

        assert!(patch.ends_session());
        assert_eq!(patch.ended_at, Some(now));
        assert_eq!(patch.end_reason, Some(EndReason::Rejected));
        assert!(!patch.is_empty());
    }
}
