//! HTTP handlers for review endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::error::review_error_response;
use crate::adapters::http::middleware::RequireAuth;
use crate::adapters::http::request::{command_metadata, parse_session_id, parse_user_id};
use crate::application::handlers::review::{
    ListPractitionerReviewsHandler, ListPractitionerReviewsQuery, SubmitReviewCommand,
    SubmitReviewHandler,
};

use super::dto::{
    PractitionerReviewsResponse, ReviewResponse, SubmitReviewRequest, SubmitReviewResponse,
};

#[derive(Clone)]
pub struct ReviewHandlers {
    submit_handler: Arc<SubmitReviewHandler>,
    list_handler: Arc<ListPractitionerReviewsHandler>,
}

impl ReviewHandlers {
    pub fn new(
        submit_handler: Arc<SubmitReviewHandler>,
        list_handler: Arc<ListPractitionerReviewsHandler>,
    ) -> Self {
        Self {
            submit_handler,
            list_handler,
        }
    }
}

/// POST /api/sessions/:id/review - the guest rates an ended session
pub async fn submit_review(
    State(handlers): State<ReviewHandlers>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<SubmitReviewRequest>,
) -> Response {
    let session_id = match parse_session_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let cmd = SubmitReviewCommand {
        session_id,
        guest_id: user.id.clone(),
        rating: req.rating,
        comment: req.comment,
    };

    match handlers
        .submit_handler
        .handle(cmd, command_metadata(&user.id, &headers))
        .await
    {
        Ok(result) => {
            let response = SubmitReviewResponse {
                review: ReviewResponse::from(&result.review),
                practitioner_rating: result.summary.map(Into::into),
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => review_error_response(e),
    }
}

/// GET /api/practitioners/:id/reviews - public reviews of a practitioner
pub async fn list_practitioner_reviews(
    State(handlers): State<ReviewHandlers>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    let practitioner_id = match parse_user_id(id, "practitioner id") {
        Ok(id) => id,
        Err(response) => return response,
    };

    let query = ListPractitionerReviewsQuery {
        practitioner_id: practitioner_id.clone(),
    };

    match handlers.list_handler.handle(query).await {
        Ok(reviews) => {
            let response = PractitionerReviewsResponse::new(practitioner_id, &reviews);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => review_error_response(e),
    }
}
