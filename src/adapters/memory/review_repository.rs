//! In-memory review repository.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, SessionId, StarRating, UserId};
use crate::domain::review::Review;
use crate::ports::ReviewRepository;

#[derive(Default)]
pub struct InMemoryReviewRepository {
    reviews: RwLock<Vec<Review>>,
}

impl InMemoryReviewRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    async fn insert(&self, review: &Review) -> Result<(), DomainError> {
        let mut reviews = self.reviews.write().await;
        if reviews.iter().any(|r| r.session_id() == review.session_id()) {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("Session {} already reviewed", review.session_id()),
            ));
        }
        reviews.push(review.clone());
        Ok(())
    }

    async fn find_by_session(&self, session_id: &SessionId) -> Result<Option<Review>, DomainError> {
        Ok(self
            .reviews
            .read()
            .await
            .iter()
            .find(|r| r.session_id() == session_id)
            .cloned())
    }

    async fn find_by_practitioner(
        &self,
        practitioner_id: &UserId,
    ) -> Result<Vec<Review>, DomainError> {
        let mut found: Vec<Review> = self
            .reviews
            .read()
            .await
            .iter()
            .filter(|r| r.practitioner_id() == practitioner_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at().cmp(a.created_at()));
        Ok(found)
    }

    async fn ratings_for_practitioner(
        &self,
        practitioner_id: &UserId,
    ) -> Result<Vec<StarRating>, DomainError> {
        Ok(self
            .reviews
            .read()
            .await
            .iter()
            .filter(|r| r.practitioner_id() == practitioner_id)
            .map(|r| r.rating())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    fn review(session_id: SessionId, rating: u8) -> Review {
        Review::new(
            session_id,
            UserId::new("g").unwrap(),
            UserId::new("p").unwrap(),
            StarRating::new(rating).unwrap(),
            None,
            Timestamp::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn second_review_for_session_conflicts() {
        let repo = InMemoryReviewRepository::new();
        let session_id = SessionId::new();
        repo.insert(&review(session_id, 4)).await.unwrap();

        let err = repo.insert(&review(session_id, 5)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn ratings_are_collected_per_practitioner() {
        let repo = InMemoryReviewRepository::new();
        repo.insert(&review(SessionId::new(), 4)).await.unwrap();
        repo.insert(&review(SessionId::new(), 5)).await.unwrap();

        let ratings = repo
            .ratings_for_practitioner(&UserId::new("p").unwrap())
            .await
            .unwrap();
        assert_eq!(ratings.len(), 2);
    }
}
