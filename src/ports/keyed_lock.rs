//! Keyed lock port - single writer per key.
//!
//! Session mutations lock `session:<id>`; admission, presence changes and
//! practitioner release lock `practitioner:<id>`. Callers never hold two
//! leases at once.

use async_trait::async_trait;
use std::any::Any;
use std::fmt;

use crate::domain::foundation::{DomainError, SessionId, UserId};

/// Lock key for a session row.
pub fn session_lock_key(id: &SessionId) -> String {
    format!("session:{}", id)
}

/// Lock key for a practitioner's presence and admission.
pub fn practitioner_lock_key(id: &UserId) -> String {
    format!("practitioner:{}", id)
}

/// Proof of holding a key.
///
/// Dropping a lease without calling [`KeyedLock::release`] still frees an
/// in-process lock; a distributed lock then expires on its own TTL.
pub struct LockLease {
    key: String,
    token: String,
    held: Option<Box<dyn Any + Send + Sync>>,
}

impl LockLease {
    pub fn new(key: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            token: token.into(),
            held: None,
        }
    }

    /// Attach a guard that is dropped with the lease.
    pub fn holding<G: Any + Send + Sync>(mut self, guard: G) -> Self {
        self.held = Some(Box::new(guard));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Unique value identifying this holder.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for LockLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockLease")
            .field("key", &self.key)
            .field("token", &self.token)
            .field("held", &self.held.is_some())
            .finish()
    }
}

#[async_trait]
pub trait KeyedLock: Send + Sync {
    /// Wait for exclusive ownership of `key`.
    ///
    /// # Errors
    ///
    /// - `LockUnavailable` if the key could not be taken within the
    ///   configured wait
    /// - `CacheError` if the lock backend is unreachable
    async fn acquire(&self, key: &str) -> Result<LockLease, DomainError>;

    /// Give up ownership. Releasing a lease that already expired is not an
    /// error.
    async fn release(&self, lease: LockLease) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_lock_is_object_safe() {
        fn _accepts_dyn(_lock: &dyn KeyedLock) {}
    }

    #[test]
    fn keys_are_namespaced() {
        let user = UserId::new("healer-1").unwrap();
        assert_eq!(practitioner_lock_key(&user), "practitioner:healer-1");

        let id = SessionId::new();
        assert_eq!(session_lock_key(&id), format!("session:{}", id));
    }

    #[test]
    fn lease_debug_hides_guard() {
        let lease = LockLease::new("k", "t").holding(42u8);
        let rendered = format!("{:?}", lease);
        assert!(rendered.contains("held: true"));
    }
}
