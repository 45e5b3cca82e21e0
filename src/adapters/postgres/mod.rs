//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresSessionRepository` - sessions with compare-and-set updates
//!   and the one-open-session-per-practitioner index
//! - `PostgresParticipantDirectory` - profiles and presence
//! - `PostgresReviewRepository` - reviews, one per session

mod participant_directory;
mod review_repository;
mod session_repository;

pub use participant_directory::PostgresParticipantDirectory;
pub use review_repository::PostgresReviewRepository;
pub use session_repository::PostgresSessionRepository;

use sqlx::postgres::{PgRow, Postgres};
use sqlx::Row;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Reads a column, mapping decode failures to `DatabaseError`.
pub(crate) fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Failed to get {}: {}", name, e),
        )
    })
}

/// Wraps a query failure with what was being attempted.
pub(crate) fn query_failed(action: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

/// Decodes a non-negative integer column stored as BIGINT.
pub(crate) fn unsigned(value: i64, name: &str) -> Result<u64, DomainError> {
    u64::try_from(value).map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Column {} holds negative value {}", name, value),
        )
    })
}
