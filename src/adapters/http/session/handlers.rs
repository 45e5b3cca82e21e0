//! HTTP handlers for session endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::error::session_error_response;
use crate::adapters::http::middleware::RequireAuth;
use crate::adapters::http::request::{command_metadata, parse_session_id, parse_user_id};
use crate::application::handlers::session::{
    ApplySessionActionCommand, ApplySessionActionHandler, GetSessionHandler, GetSessionQuery,
    IssueJoinTokenCommand, IssueJoinTokenHandler, ListMySessionsHandler, ListMySessionsQuery,
    ListPractitionerSessionsHandler, ListPractitionerSessionsQuery, StartSessionCommand,
    StartSessionHandler,
};
use crate::domain::foundation::Timestamp;

use super::dto::{
    ActionResponse, JoinTokenResponse, SessionActionRequest, SessionListResponse,
    SessionResponse, StartSessionRequest,
};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct SessionHandlers {
    start_handler: Arc<StartSessionHandler>,
    action_handler: Arc<ApplySessionActionHandler>,
    get_handler: Arc<GetSessionHandler>,
    list_mine_handler: Arc<ListMySessionsHandler>,
    list_practitioner_handler: Arc<ListPractitionerSessionsHandler>,
    token_handler: Arc<IssueJoinTokenHandler>,
}

impl SessionHandlers {
    pub fn new(
        start_handler: Arc<StartSessionHandler>,
        action_handler: Arc<ApplySessionActionHandler>,
        get_handler: Arc<GetSessionHandler>,
        list_mine_handler: Arc<ListMySessionsHandler>,
        list_practitioner_handler: Arc<ListPractitionerSessionsHandler>,
        token_handler: Arc<IssueJoinTokenHandler>,
    ) -> Self {
        Self {
            start_handler,
            action_handler,
            get_handler,
            list_mine_handler,
            list_practitioner_handler,
            token_handler,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/sessions - a guest requests a session
pub async fn start_session(
    State(handlers): State<SessionHandlers>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
    Json(req): Json<StartSessionRequest>,
) -> Response {
    let practitioner_id = match parse_user_id(req.practitioner_id, "practitionerId") {
        Ok(id) => id,
        Err(response) => return response,
    };

    let cmd = StartSessionCommand {
        guest_id: user.id.clone(),
        practitioner_id,
        live_seconds: req.live_seconds,
    };

    match handlers
        .start_handler
        .handle(cmd, command_metadata(&user.id, &headers))
        .await
    {
        Ok(result) => {
            let response = SessionResponse::from_session(&result.session, &user.id, &Timestamp::now());
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => session_error_response(e),
    }
}

/// GET /api/sessions - the caller's sessions, newest first
pub async fn list_my_sessions(
    State(handlers): State<SessionHandlers>,
    RequireAuth(user): RequireAuth,
) -> Response {
    let query = ListMySessionsQuery {
        user_id: user.id.clone(),
    };

    match handlers.list_mine_handler.handle(query).await {
        Ok(sessions) => {
            let response = SessionListResponse::new(&sessions, &user.id, &Timestamp::now());
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => session_error_response(e),
    }
}

/// GET /api/sessions/:id - one session with both profiles
pub async fn get_session(
    State(handlers): State<SessionHandlers>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let session_id = match parse_session_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let query = GetSessionQuery {
        session_id,
        user_id: user.id.clone(),
    };

    match handlers
        .get_handler
        .handle(query, command_metadata(&user.id, &headers))
        .await
    {
        Ok(view) => {
            let response = SessionResponse::from_view(view, &user.id, &Timestamp::now());
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => session_error_response(e),
    }
}

/// POST /api/sessions/:id/actions - acknowledge, mark ready, accept, reject or end
pub async fn apply_action(
    State(handlers): State<SessionHandlers>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<SessionActionRequest>,
) -> Response {
    let session_id = match parse_session_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let cmd = ApplySessionActionCommand {
        session_id,
        user_id: user.id.clone(),
        action: req.into(),
    };

    match handlers
        .action_handler
        .handle(cmd, command_metadata(&user.id, &headers))
        .await
    {
        Ok(result) => {
            let response = ActionResponse {
                session: SessionResponse::from_session(&result.session, &user.id, &Timestamp::now()),
                changed: result.changed,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => session_error_response(e),
    }
}

/// POST /api/sessions/:id/token - video join credentials for the caller
pub async fn issue_join_token(
    State(handlers): State<SessionHandlers>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    let session_id = match parse_session_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let cmd = IssueJoinTokenCommand {
        session_id,
        user_id: user.id,
    };

    match handlers.token_handler.handle(cmd).await {
        Ok(token) => (StatusCode::OK, Json(JoinTokenResponse::from(token))).into_response(),
        Err(e) => session_error_response(e),
    }
}

/// GET /api/practitioner/sessions - the calling practitioner's sessions
pub async fn list_practitioner_sessions(
    State(handlers): State<SessionHandlers>,
    RequireAuth(user): RequireAuth,
) -> Response {
    let query = ListPractitionerSessionsQuery {
        practitioner_id: user.id.clone(),
    };

    match handlers.list_practitioner_handler.handle(query).await {
        Ok(sessions) => {
            let response = SessionListResponse::new(&sessions, &user.id, &Timestamp::now());
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => session_error_response(e),
    }
}
