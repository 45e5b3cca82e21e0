//! HTTP routes for session endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    apply_action, get_session, issue_join_token, list_my_sessions, list_practitioner_sessions,
    start_session, SessionHandlers,
};

/// Creates the session router. Paths are absolute so routers from other
/// modules can be merged alongside without nesting.
pub fn session_routes(handlers: SessionHandlers) -> Router {
    Router::new()
        .route("/api/sessions", post(start_session).get(list_my_sessions))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/actions", post(apply_action))
        .route("/api/sessions/:id/token", post(issue_join_token))
        .route("/api/practitioner/sessions", get(list_practitioner_sessions))
        .with_state(handlers)
}
