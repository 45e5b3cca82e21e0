//! Timing policy shared by the session handlers.

use serde::{Deserialize, Serialize};

use crate::domain::session::SessionError;

/// Durations applied when sessions are created and swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPolicy {
    /// How long a session may wait for both parties before it is ended.
    pub waiting_timeout_secs: u64,

    /// Live duration used when the guest does not ask for one.
    pub default_live_seconds: u64,

    pub max_live_seconds: u64,

    /// Extra time a live session may run past its countdown before the
    /// sweep ends it.
    pub live_overrun_grace_secs: u64,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            waiting_timeout_secs: 120,
            default_live_seconds: 900,
            max_live_seconds: 3600,
            live_overrun_grace_secs: 120,
        }
    }
}

impl SessionPolicy {
    /// Resolves the requested live duration against the policy.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` if the request is outside `1..=max_live_seconds`.
    pub fn live_seconds(&self, requested: Option<u64>) -> Result<u64, SessionError> {
        match requested {
            None => Ok(self.default_live_seconds),
            Some(secs) if (1..=self.max_live_seconds).contains(&secs) => Ok(secs),
            Some(secs) => Err(SessionError::validation(
                "live_seconds",
                format!(
                    "must be between 1 and {} seconds, got {}",
                    self.max_live_seconds, secs
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_live_seconds_uses_default() {
        let policy = SessionPolicy::default();
        assert_eq!(policy.live_seconds(None).unwrap(), 900);
    }

    #[test]
    fn live_seconds_within_bounds_are_kept() {
        let policy = SessionPolicy::default();
        assert_eq!(policy.live_seconds(Some(1)).unwrap(), 1);
        assert_eq!(policy.live_seconds(Some(3600)).unwrap(), 3600);
    }

    #[test]
    fn zero_or_excessive_live_seconds_are_rejected() {
        let policy = SessionPolicy::default();
        assert!(matches!(
            policy.live_seconds(Some(0)),
            Err(SessionError::ValidationFailed { .. })
        ));
        assert!(matches!(
            policy.live_seconds(Some(3601)),
            Err(SessionError::ValidationFailed { .. })
        ));
    }
}
