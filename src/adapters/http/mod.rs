//! HTTP adapters - REST API implementations.
//!
//! Each feature has its own router. `app_router` merges them behind the
//! auth middleware and the shared tower layers.

pub mod error;
pub mod internal;
pub mod middleware;
pub mod participant;
pub mod request;
pub mod review;
pub mod router;
pub mod session;

pub use error::ErrorResponse;
pub use internal::SweepTrigger;
pub use participant::ParticipantHandlers;
pub use review::ReviewHandlers;
pub use router::{app_router, ApiHandlers, RouterSettings};
pub use session::SessionHandlers;
