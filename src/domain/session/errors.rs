//! Session-specific error types.

use thiserror::Error;

use crate::domain::foundation::{
    DomainError, ErrorCode, SessionId, SessionPhase, UserId, ValidationError,
};

/// Why the state machine refused an action. Never carries side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("caller is not a participant of this session")]
    NotParticipant,

    #[error("only the practitioner may perform this action")]
    NotPractitioner,

    #[error("cannot {action} while session is {phase}")]
    WrongPhase {
        phase: SessionPhase,
        action: &'static str,
    },

    #[error("practitioner must acknowledge the request before marking ready")]
    AcknowledgmentRequired,
}

/// Errors surfaced by the session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Practitioner not found: {0}")]
    PractitionerNotFound(UserId),

    #[error("Caller is not a participant of this session")]
    NotParticipant,

    #[error("Only the practitioner may perform this action")]
    NotPractitioner,

    /// Caller's directory role does not allow the operation.
    #[error("Role mismatch: {0}")]
    RoleMismatch(String),

    #[error("Cannot {action} while session is {phase}")]
    WrongPhase {
        phase: SessionPhase,
        action: &'static str,
    },

    #[error("Practitioner must acknowledge the request before marking ready")]
    AcknowledgmentRequired,

    #[error("Practitioner is not available")]
    PractitionerUnavailable,

    /// Lost a race with a concurrent writer. Re-fetch and retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    #[error("Error: {0}")]
    Infrastructure(String),
}

impl SessionError {
    pub fn not_found(id: SessionId) -> Self {
        SessionError::NotFound(id)
    }

    pub fn role_mismatch(message: impl Into<String>) -> Self {
        SessionError::RoleMismatch(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        SessionError::Conflict(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SessionError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        SessionError::Infrastructure(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::NotFound(_) => ErrorCode::SessionNotFound,
            SessionError::PractitionerNotFound(_) => ErrorCode::ParticipantNotFound,
            SessionError::NotParticipant
            | SessionError::NotPractitioner
            | SessionError::RoleMismatch(_) => ErrorCode::Forbidden,
            SessionError::WrongPhase { .. }
            | SessionError::AcknowledgmentRequired
            | SessionError::PractitionerUnavailable => ErrorCode::InvalidStateTransition,
            SessionError::Conflict(_) => ErrorCode::Conflict,
            SessionError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            SessionError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// True when re-fetching state and retrying may succeed.
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

impl From<Rejection> for SessionError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::NotParticipant => SessionError::NotParticipant,
            Rejection::NotPractitioner => SessionError::NotPractitioner,
            Rejection::WrongPhase { phase, action } => SessionError::WrongPhase { phase, action },
            Rejection::AcknowledgmentRequired => SessionError::AcknowledgmentRequired,
        }
    }
}

impl From<ValidationError> for SessionError {
    fn from(err: ValidationError) -> Self {
        SessionError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for SessionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::Conflict | ErrorCode::LockUnavailable => SessionError::Conflict(err.message),
            ErrorCode::ValidationFailed => SessionError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            _ => SessionError::Infrastructure(err.to_string()),
        }
    }
}
