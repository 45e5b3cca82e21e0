//! Error body and domain error mapping shared by every router.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::review::ReviewError;
use crate::domain::session::SessionError;

/// JSON error body.
///
/// `retryable` tells the client that re-reading state and trying again
/// may succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable: false,
        }
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHENTICATED", message)
    }

    pub fn not_found(resource_type: &str, id: &str) -> Self {
        Self::new("NOT_FOUND", format!("{} not found: {}", resource_type, id))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new("SERVICE_UNAVAILABLE", message).retryable()
    }

    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

pub fn session_error_response(error: SessionError) -> Response {
    let message = error.to_string();
    match error {
        SessionError::NotFound(id) => {
            ErrorResponse::not_found("Session", &id.to_string()).with_status(StatusCode::NOT_FOUND)
        }
        SessionError::PractitionerNotFound(id) => ErrorResponse::not_found("Practitioner", id.as_str())
            .with_status(StatusCode::NOT_FOUND),
        SessionError::NotParticipant
        | SessionError::NotPractitioner
        | SessionError::RoleMismatch(_) => {
            ErrorResponse::forbidden(message).with_status(StatusCode::FORBIDDEN)
        }
        SessionError::WrongPhase { .. } => {
            ErrorResponse::new("WRONG_PHASE", message).with_status(StatusCode::CONFLICT)
        }
        SessionError::AcknowledgmentRequired => {
            ErrorResponse::new("ACKNOWLEDGMENT_REQUIRED", message).with_status(StatusCode::CONFLICT)
        }
        SessionError::PractitionerUnavailable => ErrorResponse::new("PRACTITIONER_UNAVAILABLE", message)
            .with_status(StatusCode::CONFLICT),
        SessionError::Conflict(_) => ErrorResponse::new("CONFLICT", message)
            .retryable()
            .with_status(StatusCode::CONFLICT),
        SessionError::ValidationFailed { .. } => {
            ErrorResponse::bad_request(message).with_status(StatusCode::BAD_REQUEST)
        }
        SessionError::Infrastructure(detail) => {
            tracing::error!(error = %detail, "Session request failed");
            ErrorResponse::unavailable("Session store unavailable")
                .with_status(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

pub fn review_error_response(error: ReviewError) -> Response {
    let message = error.to_string();
    match error {
        ReviewError::SessionNotFound(id) => {
            ErrorResponse::not_found("Session", &id.to_string()).with_status(StatusCode::NOT_FOUND)
        }
        ReviewError::PractitionerNotFound(id) => ErrorResponse::not_found("Practitioner", id.as_str())
            .with_status(StatusCode::NOT_FOUND),
        ReviewError::NotSessionGuest => {
            ErrorResponse::forbidden(message).with_status(StatusCode::FORBIDDEN)
        }
        ReviewError::SessionNotEnded(_) => {
            ErrorResponse::new("WRONG_PHASE", message).with_status(StatusCode::CONFLICT)
        }
        ReviewError::AlreadyReviewed => {
            ErrorResponse::new("ALREADY_REVIEWED", message).with_status(StatusCode::CONFLICT)
        }
        ReviewError::ValidationFailed { .. } => {
            ErrorResponse::bad_request(message).with_status(StatusCode::BAD_REQUEST)
        }
        ReviewError::Infrastructure(detail) => {
            tracing::error!(error = %detail, "Review request failed");
            ErrorResponse::unavailable("Review store unavailable")
                .with_status(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{SessionId, SessionPhase};

    #[test]
    fn not_found_maps_to_404() {
        let response = session_error_response(SessionError::NotFound(SessionId::new()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn authorization_errors_map_to_403() {
        for error in [
            SessionError::NotParticipant,
            SessionError::NotPractitioner,
            SessionError::role_mismatch("guest only"),
        ] {
            assert_eq!(session_error_response(error).status(), StatusCode::FORBIDDEN);
        }
    }

    #[test]
    fn state_errors_map_to_409() {
        let wrong_phase = SessionError::WrongPhase {
            phase: SessionPhase::Ended,
            action: "mark_ready",
        };
        assert_eq!(session_error_response(wrong_phase).status(), StatusCode::CONFLICT);
        assert_eq!(
            session_error_response(SessionError::AcknowledgmentRequired).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            session_error_response(SessionError::PractitionerUnavailable).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn conflict_is_retryable() {
        let conflict = SessionError::conflict("version moved");
        assert!(conflict.is_retryable());
        assert_eq!(session_error_response(conflict).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn validation_maps_to_400() {
        let error = SessionError::validation("live_seconds", "must be positive");
        assert_eq!(session_error_response(error).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn infrastructure_maps_to_503() {
        let error = SessionError::infrastructure("pool timed out");
        assert_eq!(
            session_error_response(error).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn duplicate_review_maps_to_409() {
        let response = review_error_response(ReviewError::AlreadyReviewed);
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn error_body_serializes_retryable_flag() {
        let body = serde_json::to_value(ErrorResponse::new("CONFLICT", "moved").retryable()).unwrap();
        assert_eq!(body["code"], "CONFLICT");
        assert_eq!(body["retryable"], true);
    }
}
