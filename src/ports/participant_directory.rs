//! Participant directory port.
//!
//! Resolves users to their role and holds practitioner presence. The
//! `in_service` flag is written only by the session lifecycle.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::participant::Participant;
use crate::domain::review::RatingSummary;

#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    /// Look up a participant. `None` if the user has no directory record.
    async fn find(&self, id: &UserId) -> Result<Option<Participant>, DomainError>;

    /// Create or replace a directory record.
    async fn save(&self, participant: &Participant) -> Result<(), DomainError>;

    /// # Errors
    ///
    /// - `ParticipantNotFound` if the user has no record
    async fn set_online(&self, id: &UserId, online: bool) -> Result<(), DomainError>;

    /// # Errors
    ///
    /// - `ParticipantNotFound` if the user has no record
    async fn set_in_service(&self, id: &UserId, in_service: bool) -> Result<(), DomainError>;

    /// Practitioners currently flagged in service.
    async fn list_in_service(&self) -> Result<Vec<UserId>, DomainError>;

    /// Store a freshly computed aggregate rating.
    async fn update_rating(&self, id: &UserId, summary: RatingSummary)
        -> Result<(), DomainError>;
}
