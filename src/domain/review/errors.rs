//! Review-specific error types.

use thiserror::Error;

use crate::domain::foundation::{
    DomainError, ErrorCode, SessionId, SessionPhase, UserId, ValidationError,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Practitioner not found: {0}")]
    PractitionerNotFound(UserId),

    /// Only the session's guest may review it.
    #[error("Only the session's guest may review it")]
    NotSessionGuest,

    #[error("Session must be ended before it can be reviewed (currently {0})")]
    SessionNotEnded(SessionPhase),

    #[error("Session has already been reviewed")]
    AlreadyReviewed,

    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    #[error("Error: {0}")]
    Infrastructure(String),
}

impl ReviewError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ReviewError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ReviewError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            ReviewError::PractitionerNotFound(_) => ErrorCode::ParticipantNotFound,
            ReviewError::NotSessionGuest => ErrorCode::Forbidden,
            ReviewError::SessionNotEnded(_) => ErrorCode::InvalidStateTransition,
            ReviewError::AlreadyReviewed => ErrorCode::Conflict,
            ReviewError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            ReviewError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<ValidationError> for ReviewError {
    fn from(err: ValidationError) -> Self {
        ReviewError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for ReviewError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::Conflict => ReviewError::AlreadyReviewed,
            ErrorCode::ValidationFailed => ReviewError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            _ => ReviewError::Infrastructure(err.to_string()),
        }
    }
}
