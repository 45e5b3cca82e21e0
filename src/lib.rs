//! Attune - guest/practitioner session lifecycle service.
//!
//! A guest requests a session with an online practitioner; both parties
//! acknowledge and mark ready; the session goes live on a countdown and
//! ends by either party, by rejection, or by timeout.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
