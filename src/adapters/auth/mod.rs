//! Authentication adapters.
//!
//! Implementations of the `SessionValidator` port:
//!
//! - `jwks` - Validates provider-issued JWTs against the provider's JWKS
//! - `mock` - Fixed token table for tests and local runs

mod jwks;
mod mock;

pub use jwks::{JwksConfig, JwksSessionValidator};
pub use mock::MockSessionValidator;
