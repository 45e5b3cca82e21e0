//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, enums, and error types
//! that form the vocabulary of the session marketplace domain.

mod auth;
mod command;
mod errors;
mod events;
mod ids;
mod rating;
mod session_phase;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use command::CommandMetadata;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{domain_event, DomainEvent, EventEnvelope, EventId, EventMetadata};
pub use ids::{ReviewId, SessionId, UserId};
pub use rating::StarRating;
pub use session_phase::SessionPhase;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
