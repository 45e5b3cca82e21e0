//! Request and response bodies for review endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::review::PractitionerReviews;
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::review::{RatingSummary, Review};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: String,
    pub session_id: String,
    pub guest_id: UserId,
    pub practitioner_id: UserId,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: Timestamp,
}

impl From<&Review> for ReviewResponse {
    fn from(review: &Review) -> Self {
        Self {
            id: review.id().to_string(),
            session_id: review.session_id().to_string(),
            guest_id: review.guest_id().clone(),
            practitioner_id: review.practitioner_id().clone(),
            rating: review.rating().value(),
            comment: review.comment().map(str::to_owned),
            created_at: *review.created_at(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummaryResponse {
    pub average: Option<f64>,
    pub count: u32,
}

impl From<RatingSummary> for RatingSummaryResponse {
    fn from(summary: RatingSummary) -> Self {
        Self {
            average: summary.average,
            count: summary.count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewResponse {
    pub review: ReviewResponse,

    /// Absent when the aggregate could not be refreshed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practitioner_rating: Option<RatingSummaryResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PractitionerReviewsResponse {
    pub practitioner_id: UserId,
    pub summary: RatingSummaryResponse,
    pub items: Vec<ReviewResponse>,
}

impl PractitionerReviewsResponse {
    pub fn new(practitioner_id: UserId, reviews: &PractitionerReviews) -> Self {
        Self {
            practitioner_id,
            summary: reviews.summary.into(),
            items: reviews.reviews.iter().map(ReviewResponse::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_is_optional() {
        let req: SubmitReviewRequest = serde_json::from_str(r#"{"rating":4}"#).unwrap();
        assert_eq!(req.rating, 4);
        assert!(req.comment.is_none());
    }

    #[test]
    fn negative_rating_is_rejected_at_parse() {
        let result: Result<SubmitReviewRequest, _> = serde_json::from_str(r#"{"rating":-1}"#);
        assert!(result.is_err());
    }
}
