//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;

pub use handlers::participant::{
    InitProfileCommand, InitProfileHandler, SetAvailabilityCommand, SetAvailabilityHandler,
};
pub use handlers::review::{
    ListPractitionerReviewsHandler, ListPractitionerReviewsQuery, PractitionerReviews,
    SubmitReviewCommand, SubmitReviewHandler, SubmitReviewResult,
};
pub use handlers::session::{
    ApplySessionActionCommand, ApplySessionActionHandler, ApplySessionActionResult,
    GetSessionHandler, GetSessionQuery, IssueJoinTokenCommand, IssueJoinTokenHandler,
    ListMySessionsHandler, ListMySessionsQuery, ListPractitionerSessionsHandler,
    ListPractitionerSessionsQuery, SessionCoordinator, SessionPolicy, SessionView,
    StartSessionCommand, StartSessionHandler, StartSessionResult, SweepReport,
    SweepTimeoutsCommand, SweepTimeoutsHandler,
};
