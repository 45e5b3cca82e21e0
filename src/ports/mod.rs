//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `SessionRepository` - Session rows with compare-and-set updates
//! - `ParticipantDirectory` - Roles and practitioner presence
//! - `ReviewRepository` - Post-session reviews
//!
//! ## Coordination Ports
//!
//! - `KeyedLock` - Single writer per session / per practitioner
//!
//! ## Collaborator Ports
//!
//! - `TransportTokenIssuer` - Video join credentials
//! - `SessionValidator` - Bearer token validation
//! - `EventPublisher` - Domain event delivery

mod event_publisher;
mod keyed_lock;
mod participant_directory;
mod review_repository;
mod session_repository;
mod session_validator;
mod transport_token_issuer;

pub use event_publisher::EventPublisher;
pub use keyed_lock::{practitioner_lock_key, session_lock_key, KeyedLock, LockLease};
pub use participant_directory::ParticipantDirectory;
pub use review_repository::ReviewRepository;
pub use session_repository::SessionRepository;
pub use session_validator::SessionValidator;
pub use transport_token_issuer::{JoinToken, TransportTokenIssuer};
