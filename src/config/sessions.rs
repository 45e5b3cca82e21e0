//! Session lifecycle timing and coordination settings

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::handlers::session::SessionPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionsConfig {
    /// How long a session may sit in `waiting` before the sweep ends it
    #[serde(default = "default_waiting_timeout")]
    pub waiting_timeout_secs: u64,

    /// Live countdown used when the guest does not ask for one
    #[serde(default = "default_live_seconds")]
    pub default_live_seconds: u64,

    #[serde(default = "default_max_live_seconds")]
    pub max_live_seconds: u64,

    /// Period of the background timeout sweep
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Extra time a live session may run past its countdown before the
    /// sweep ends it
    #[serde(default = "default_overrun_grace")]
    pub live_overrun_grace_secs: u64,

    /// Longest wait for a session or practitioner lock
    #[serde(default = "default_lock_wait")]
    pub lock_wait_ms: u64,

    /// Lease lifetime for distributed locks
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_ms: u64,

    /// Shared secret for `POST /internal/sweep`. The endpoint is disabled
    /// when unset.
    #[serde(default)]
    pub sweep_trigger_token: Option<SecretString>,
}

impl SessionsConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_millis(self.lock_ttl_ms)
    }

    pub fn policy(&self) -> SessionPolicy {
        SessionPolicy {
            waiting_timeout_secs: self.waiting_timeout_secs,
            default_live_seconds: self.default_live_seconds,
            max_live_seconds: self.max_live_seconds,
            live_overrun_grace_secs: self.live_overrun_grace_secs,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let non_zero = [
            ("waiting_timeout_secs", self.waiting_timeout_secs),
            ("default_live_seconds", self.default_live_seconds),
            ("max_live_seconds", self.max_live_seconds),
            ("sweep_interval_secs", self.sweep_interval_secs),
            ("lock_wait_ms", self.lock_wait_ms),
            ("lock_ttl_ms", self.lock_ttl_ms),
        ];
        if let Some((name, _)) = non_zero.iter().find(|(_, value)| *value == 0) {
            return Err(ValidationError::ZeroDuration(*name));
        }
        if self.default_live_seconds > self.max_live_seconds {
            return Err(ValidationError::DefaultLiveExceedsMax);
        }
        Ok(())
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            waiting_timeout_secs: default_waiting_timeout(),
            default_live_seconds: default_live_seconds(),
            max_live_seconds: default_max_live_seconds(),
            sweep_interval_secs: default_sweep_interval(),
            live_overrun_grace_secs: default_overrun_grace(),
            lock_wait_ms: default_lock_wait(),
            lock_ttl_ms: default_lock_ttl(),
            sweep_trigger_token: None,
        }
    }
}

fn default_waiting_timeout() -> u64 {
    120
}

fn default_live_seconds() -> u64 {
    900
}

fn default_max_live_seconds() -> u64 {
    3600
}

fn default_sweep_interval() -> u64 {
    15
}

fn default_overrun_grace() -> u64 {
    120
}

fn default_lock_wait() -> u64 {
    2000
}

fn default_lock_ttl() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionsConfig::default();
        assert_eq!(config.waiting_timeout_secs, 120);
        assert_eq!(config.default_live_seconds, 900);
        assert_eq!(config.max_live_seconds, 3600);
        assert_eq!(config.sweep_interval(), Duration::from_secs(15));
        assert_eq!(config.lock_wait(), Duration::from_millis(2000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn policy_mirrors_timings() {
        let policy = SessionsConfig::default().policy();
        assert_eq!(policy.waiting_timeout_secs, 120);
        assert_eq!(policy.live_overrun_grace_secs, 120);
    }

    #[test]
    fn zero_sweep_interval_is_invalid() {
        let config = SessionsConfig {
            sweep_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::ZeroDuration("sweep_interval_secs"))
        );
    }

    #[test]
    fn default_live_cannot_exceed_max() {
        let config = SessionsConfig {
            default_live_seconds: 7200,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::DefaultLiveExceedsMax));
    }
}
