//! ListPractitionerReviewsHandler - public reviews of one practitioner.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::review::{RatingSummary, Review, ReviewError};
use crate::ports::ReviewRepository;

#[derive(Debug, Clone)]
pub struct ListPractitionerReviewsQuery {
    pub practitioner_id: UserId,
}

#[derive(Debug, Clone)]
pub struct PractitionerReviews {
    /// Newest first.
    pub reviews: Vec<Review>,
    pub summary: RatingSummary,
}

pub struct ListPractitionerReviewsHandler {
    reviews: Arc<dyn ReviewRepository>,
}

impl ListPractitionerReviewsHandler {
    pub fn new(reviews: Arc<dyn ReviewRepository>) -> Self {
        Self { reviews }
    }

    pub async fn handle(
        &self,
        query: ListPractitionerReviewsQuery,
    ) -> Result<PractitionerReviews, ReviewError> {
        let reviews = self
            .reviews
            .find_by_practitioner(&query.practitioner_id)
            .await?;
        let summary = RatingSummary::from_ratings(reviews.iter().map(|r| r.rating()));
        Ok(PractitionerReviews { reviews, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryReviewRepository;
    use crate::domain::foundation::{SessionId, StarRating, Timestamp};

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    #[tokio::test]
    async fn lists_reviews_with_summary() {
        let repo = Arc::new(InMemoryReviewRepository::new());
        for rating in [2, 5] {
            let review = Review::new(
                SessionId::new(),
                uid("guest"),
                uid("healer"),
                StarRating::new(rating).unwrap(),
                None,
                Timestamp::now(),
            )
            .unwrap();
            repo.insert(&review).await.unwrap();
        }
        let handler = ListPractitionerReviewsHandler::new(repo);

        let listed = handler
            .handle(ListPractitionerReviewsQuery {
                practitioner_id: uid("healer"),
            })
            .await
            .unwrap();

        assert_eq!(listed.reviews.len(), 2);
        assert_eq!(listed.summary.average, Some(3.5));

        let empty = handler
            .handle(ListPractitionerReviewsQuery {
                practitioner_id: uid("other"),
            })
            .await
            .unwrap();
        assert!(empty.reviews.is_empty());
        assert_eq!(empty.summary, RatingSummary::empty());
    }
}
