//! Transport token port - credentials for joining the video channel.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::foundation::{DomainError, Timestamp};

/// A bounded-lifetime credential for one uid on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinToken {
    pub token: String,
    pub channel: String,
    pub uid: u32,
    pub expires_at: Timestamp,
}

#[async_trait]
pub trait TransportTokenIssuer: Send + Sync {
    /// # Errors
    ///
    /// - `TransportError` if the credential cannot be produced
    async fn issue(&self, channel: &str, uid: u32, now: Timestamp)
        -> Result<JoinToken, DomainError>;
}
