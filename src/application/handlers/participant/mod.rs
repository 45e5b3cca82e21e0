//! Participant directory handlers: role initialization and presence.

mod init_profile;
mod set_availability;

pub use init_profile::{InitProfileCommand, InitProfileHandler};
pub use set_availability::{SetAvailabilityCommand, SetAvailabilityHandler};
