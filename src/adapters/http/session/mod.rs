//! HTTP adapter for session endpoints.
//!
//! - `POST /api/sessions` - Guest requests a session
//! - `GET /api/sessions` - Caller's sessions
//! - `GET /api/sessions/:id` - One session with both profiles
//! - `POST /api/sessions/:id/actions` - Participant action
//! - `POST /api/sessions/:id/token` - Video join token
//! - `GET /api/practitioner/sessions` - Practitioner's sessions

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::SessionHandlers;
pub use routes::session_routes;
