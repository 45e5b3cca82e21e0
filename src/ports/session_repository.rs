//! Session store port.
//!
//! The store offers compare-and-set on the session `version` so that a
//! read-modify-write can detect a concurrent writer instead of silently
//! overwriting it.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SessionId, SessionPhase, UserId};
use crate::domain::session::Session;

/// Repository port for Session aggregate persistence.
///
/// Implementations must enforce that a practitioner has at most one
/// session whose phase is not `ended`.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the practitioner already has an open session
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, session: &Session) -> Result<(), DomainError>;

    /// Write `session` only if the stored version still equals
    /// `expected_version`.
    ///
    /// Returns `false` when another writer got there first.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the row does not exist
    /// - `DatabaseError` on persistence failure
    async fn update_if_version(
        &self,
        session: &Session,
        expected_version: i64,
    ) -> Result<bool, DomainError>;

    /// Find a session by its ID.
    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, DomainError>;

    /// All sessions currently in `phase`, oldest first.
    async fn find_by_phase(&self, phase: SessionPhase) -> Result<Vec<Session>, DomainError>;

    /// The practitioner's sessions that have not ended.
    async fn find_open_by_practitioner(
        &self,
        practitioner_id: &UserId,
    ) -> Result<Vec<Session>, DomainError>;

    /// Sessions where the user is guest or practitioner, newest first.
    async fn find_by_participant(&self, user_id: &UserId) -> Result<Vec<Session>, DomainError>;
}
