//! Redis-backed keyed lock for multi-instance deployments.
//!
//! Acquire is `SET key token NX PX ttl`, retried until the configured wait
//! runs out. Release deletes the key only if it still holds our token, so
//! a lease that expired and was taken by someone else is left alone.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{KeyedLock, LockLease};

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

const RETRY_DELAY: Duration = Duration::from_millis(25);

#[derive(Clone)]
pub struct RedisKeyedLock {
    conn: MultiplexedConnection,
    prefix: String,
    ttl: Duration,
    wait: Duration,
}

impl RedisKeyedLock {
    pub fn new(conn: MultiplexedConnection, ttl: Duration, wait: Duration) -> Self {
        Self {
            conn,
            prefix: "attune:lock:".to_string(),
            ttl,
            wait,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn redis_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn try_set(&self, redis_key: &str, token: &str) -> Result<bool, DomainError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(redis_key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(self.ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(reply.is_some())
    }
}

fn cache_error(e: redis::RedisError) -> DomainError {
    DomainError::new(ErrorCode::CacheError, format!("Redis lock error: {}", e))
}

#[async_trait]
impl KeyedLock for RedisKeyedLock {
    async fn acquire(&self, key: &str) -> Result<LockLease, DomainError> {
        let redis_key = self.redis_key(key);
        let token = Uuid::new_v4().to_string();
        let deadline = Instant::now() + self.wait;

        loop {
            if self.try_set(&redis_key, &token).await? {
                return Ok(LockLease::new(key, token));
            }
            if Instant::now() + RETRY_DELAY > deadline {
                tracing::warn!(key, "Redis lock wait timed out");
                return Err(DomainError::new(
                    ErrorCode::LockUnavailable,
                    format!("Timed out waiting for lock '{}'", key),
                ));
            }
            tokio::time::sleep(RETRY_DELAY).await;
        }
    }

    async fn release(&self, lease: LockLease) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(self.redis_key(lease.key()))
            .arg(lease.token())
            .invoke_async(&mut conn)
            .await
            .map_err(cache_error)?;

        if deleted == 0 {
            tracing::warn!(key = lease.key(), "Lock lease expired before release");
        }
        Ok(())
    }
}

impl std::fmt::Debug for RedisKeyedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisKeyedLock")
            .field("prefix", &self.prefix)
            .field("ttl", &self.ttl)
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_script_compares_token_before_delete() {
        assert!(RELEASE_SCRIPT.contains("GET"));
        assert!(RELEASE_SCRIPT.contains("DEL"));
    }

    // Behaviour against a live server is covered by running the service
    // with ATTUNE__REDIS__URL set; unit tests do not start Redis.
}
