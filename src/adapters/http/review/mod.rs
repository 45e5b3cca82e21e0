//! HTTP adapter for review endpoints.
//!
//! - `POST /api/sessions/:id/review` - Guest rates an ended session
//! - `GET /api/practitioners/:id/reviews` - Practitioner's reviews and rating

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::ReviewHandlers;
pub use routes::review_routes;
