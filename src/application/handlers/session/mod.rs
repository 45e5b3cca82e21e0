//! Session command and query handlers.

mod apply_session_action;
mod coordinator;
mod get_session;
mod issue_join_token;
mod list_my_sessions;
mod list_practitioner_sessions;
mod policy;
mod start_session;
mod sweep_timeouts;

pub use apply_session_action::{
    ApplySessionActionCommand, ApplySessionActionHandler, ApplySessionActionResult,
};
pub use coordinator::{SessionCoordinator, Transition, MAX_CAS_ATTEMPTS};
pub use get_session::{GetSessionHandler, GetSessionQuery, SessionView};
pub use issue_join_token::{IssueJoinTokenCommand, IssueJoinTokenHandler};
pub use list_my_sessions::{ListMySessionsHandler, ListMySessionsQuery};
pub use list_practitioner_sessions::{
    ListPractitionerSessionsHandler, ListPractitionerSessionsQuery,
};
pub use policy::SessionPolicy;
pub use start_session::{StartSessionCommand, StartSessionHandler, StartSessionResult};
pub use sweep_timeouts::{SweepReport, SweepTimeoutsCommand, SweepTimeoutsHandler};
