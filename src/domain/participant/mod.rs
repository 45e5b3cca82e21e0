//! Participant directory records.
//!
//! A participant is either a guest (requests sessions) or a practitioner
//! (provides them). Practitioners carry presence flags: `is_online` is
//! toggled by the practitioner, `in_service` is owned by the session
//! lifecycle and is true while they are bound to an open session.

mod participant;
mod role;

pub use participant::Participant;
pub use role::ParticipantRole;
