//! HTTP routes for review endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{list_practitioner_reviews, submit_review, ReviewHandlers};

pub fn review_routes(handlers: ReviewHandlers) -> Router {
    Router::new()
        .route("/api/sessions/:id/review", post(submit_review))
        .route("/api/practitioners/:id/reviews", get(list_practitioner_reviews))
        .with_state(handlers)
}
