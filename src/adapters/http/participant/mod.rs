//! HTTP adapter for the participant directory.
//!
//! - `POST /api/profile` - Signed-up user picks a role
//! - `PUT /api/presence` - Practitioner goes online or offline

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::adapters::http::error::session_error_response;
use crate::adapters::http::middleware::RequireAuth;
use crate::adapters::http::session::dto::ParticipantResponse;
use crate::application::handlers::participant::{
    InitProfileCommand, InitProfileHandler, SetAvailabilityCommand, SetAvailabilityHandler,
};
use crate::domain::participant::ParticipantRole;

#[derive(Clone)]
pub struct ParticipantHandlers {
    init_handler: Arc<InitProfileHandler>,
    availability_handler: Arc<SetAvailabilityHandler>,
}

impl ParticipantHandlers {
    pub fn new(
        init_handler: Arc<InitProfileHandler>,
        availability_handler: Arc<SetAvailabilityHandler>,
    ) -> Self {
        Self {
            init_handler,
            availability_handler,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitProfileRequest {
    pub role: ParticipantRole,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRequest {
    pub is_online: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceResponse {
    pub is_online: bool,
    pub in_service: bool,
    pub available: bool,
}

pub fn participant_routes(handlers: ParticipantHandlers) -> Router {
    Router::new()
        .route("/api/profile", post(init_profile))
        .route("/api/presence", put(set_presence))
        .with_state(handlers)
}

/// POST /api/profile
pub async fn init_profile(
    State(handlers): State<ParticipantHandlers>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<InitProfileRequest>,
) -> Response {
    let cmd = InitProfileCommand {
        user_id: user.id,
        role: req.role,
        display_name: req.display_name,
        avatar_url: req.avatar_url,
    };

    match handlers.init_handler.handle(cmd).await {
        Ok(participant) => {
            (StatusCode::OK, Json(ParticipantResponse::from(participant))).into_response()
        }
        Err(e) => session_error_response(e),
    }
}

/// PUT /api/presence
pub async fn set_presence(
    State(handlers): State<ParticipantHandlers>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<PresenceRequest>,
) -> Response {
    let cmd = SetAvailabilityCommand {
        user_id: user.id,
        online: req.is_online,
    };

    match handlers.availability_handler.handle(cmd).await {
        Ok(participant) => {
            let response = PresenceResponse {
                is_online: participant.is_online,
                in_service: participant.in_service,
                available: participant.is_available(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => session_error_response(e),
    }
}
