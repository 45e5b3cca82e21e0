//! Review module - Guest feedback on ended sessions.

mod errors;
mod events;
mod review;
mod summary;

pub use errors::ReviewError;
pub use events::ReviewSubmitted;
pub use review::{Review, MAX_COMMENT_LENGTH};
pub use summary::RatingSummary;
