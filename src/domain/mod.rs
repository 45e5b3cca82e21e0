//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, enums, errors)
//! - `participant` - Guests and practitioners with presence flags
//! - `session` - Session aggregate and its pure state machine
//! - `review` - Post-session reviews and rating aggregation

pub mod foundation;
pub mod participant;
pub mod review;
pub mod session;
