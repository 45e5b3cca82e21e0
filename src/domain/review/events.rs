//! Review domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{domain_event, EventId, ReviewId, SessionId, Timestamp, UserId};

/// Published after a review lands and the practitioner's rating is recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSubmitted {
    pub event_id: EventId,
    pub review_id: ReviewId,
    pub session_id: SessionId,
    pub practitioner_id: UserId,
    pub rating: u8,
    pub rating_average: f64,
    pub review_count: u32,
    pub submitted_at: Timestamp,
}

domain_event!(
    ReviewSubmitted,
    event_type = "review.submitted.v1",
    aggregate_id = review_id,
    aggregate_type = "Review",
    occurred_at = submitted_at,
    event_id = event_id
);
