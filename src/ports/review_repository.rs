//! Review repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SessionId, StarRating, UserId};
use crate::domain::review::Review;

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Persist a new review.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the session already has a review
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, review: &Review) -> Result<(), DomainError>;

    async fn find_by_session(&self, session_id: &SessionId) -> Result<Option<Review>, DomainError>;

    /// Reviews for a practitioner, newest first.
    async fn find_by_practitioner(&self, practitioner_id: &UserId)
        -> Result<Vec<Review>, DomainError>;

    /// Every rating the practitioner has received.
    async fn ratings_for_practitioner(
        &self,
        practitioner_id: &UserId,
    ) -> Result<Vec<StarRating>, DomainError>;
}
