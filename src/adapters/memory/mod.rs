//! In-memory implementations of the storage ports.
//!
//! Used by tests and by local runs without a database. They honour the
//! same contracts as the Postgres adapters, including compare-and-set on
//! session versions and one open session per practitioner.

mod participant_directory;
mod review_repository;
mod session_repository;

pub use participant_directory::InMemoryParticipantDirectory;
pub use review_repository::InMemoryReviewRepository;
pub use session_repository::InMemorySessionRepository;
