//! Session module - Live session lifecycle.
//!
//! A session binds one guest to one practitioner and moves through
//! `waiting -> live -> ended` (or `waiting -> ended`). All legality rules
//! live in the pure [`decide`] function; the application layer persists
//! the [`SessionPatch`] it returns.

mod action;
mod aggregate;
mod errors;
mod events;
mod machine;
mod patch;
mod transport;

pub use action::{Actor, PartyRole, SessionAction};
pub use aggregate::{EndReason, Session};
pub use errors::{Rejection, SessionError};
pub use events::{
    ParticipantReady, PractitionerAcknowledged, SessionEnded, SessionRequested, SessionWentLive,
};
pub use machine::decide;
pub use patch::SessionPatch;
pub use transport::TransportBinding;
