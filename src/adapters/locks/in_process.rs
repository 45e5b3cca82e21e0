//! In-process keyed lock.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{KeyedLock, LockLease};

/// One tokio mutex per key, created on first use. Idle slots are pruned on
/// release and whenever a wait times out.
pub struct InProcessKeyedLock {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    wait: Duration,
}

impl InProcessKeyedLock {
    pub fn new(wait: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            wait,
        }
    }

    fn slot(&self, key: &str) -> Result<Arc<AsyncMutex<()>>, DomainError> {
        let mut slots = self.slots.lock().map_err(|_| poisoned())?;
        Ok(slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone())
    }

    /// Drops every slot nobody holds or waits on. Covers keys whose last
    /// user timed out or dropped its lease without releasing.
    fn prune_idle(&self) -> Result<(), DomainError> {
        let mut slots = self.slots.lock().map_err(|_| poisoned())?;
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        Ok(())
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Default for InProcessKeyedLock {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

fn poisoned() -> DomainError {
    DomainError::new(ErrorCode::InternalError, "Keyed lock table poisoned")
}

#[async_trait]
impl KeyedLock for InProcessKeyedLock {
    async fn acquire(&self, key: &str) -> Result<LockLease, DomainError> {
        let slot = self.slot(key)?;

        let waited = tokio::time::timeout(self.wait, slot.lock_owned()).await;
        match waited {
            Ok(guard) => Ok(LockLease::new(key, Uuid::new_v4().to_string()).holding(guard)),
            Err(_) => {
                tracing::warn!(key, wait_ms = self.wait.as_millis() as u64, "Lock wait timed out");
                self.prune_idle()?;
                Err(DomainError::new(
                    ErrorCode::LockUnavailable,
                    format!("Timed out waiting for lock '{}'", key),
                ))
            }
        }
    }

    async fn release(&self, lease: LockLease) -> Result<(), DomainError> {
        let key = lease.key().to_string();
        drop(lease);

        let mut slots = self.slots.lock().map_err(|_| poisoned())?;
        let idle = slots
            .get(&key)
            .map(|slot| Arc::strong_count(slot) == 1)
            .unwrap_or(false);
        if idle {
            slots.remove(&key);
        }
        Ok(())
    }
}
