//! Adapters - Implementations of port interfaces.
//!
//! - `postgres` - Session, directory and review storage on PostgreSQL
//! - `memory` - In-memory storage for tests and local runs
//! - `locks` - Keyed locks (in-process, Redis)
//! - `events` - In-memory event bus
//! - `auth` - Bearer token validation (JWKS, mock)
//! - `video` - Video join token issuer
//! - `sweeper` - Background timeout sweep
//! - `http` - axum routers

pub mod auth;
pub mod events;
pub mod http;
pub mod locks;
pub mod memory;
pub mod postgres;
pub mod sweeper;
pub mod video;

pub use events::InMemoryEventBus;
