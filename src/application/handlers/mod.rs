//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod participant;
pub mod review;
pub mod session;
