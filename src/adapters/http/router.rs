//! Application router: every feature router plus the shared layers.

use std::time::Duration;

use axum::{
    http::{HeaderValue, StatusCode},
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::internal::{internal_routes, SweepTrigger};
use super::middleware::{auth_middleware, AuthState};
use super::participant::{participant_routes, ParticipantHandlers};
use super::review::{review_routes, ReviewHandlers};
use super::session::{session_routes, SessionHandlers};

/// Everything the HTTP surface dispatches to.
#[derive(Clone)]
pub struct ApiHandlers {
    pub sessions: SessionHandlers,
    pub reviews: ReviewHandlers,
    pub participants: ParticipantHandlers,
    pub sweep: SweepTrigger,
}

/// Router-wide settings taken from the server configuration.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub request_timeout: Duration,

    /// Allowed origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cors_origins: Vec::new(),
        }
    }
}

pub fn app_router(handlers: ApiHandlers, validator: AuthState, settings: &RouterSettings) -> Router {
    let api = Router::new()
        .merge(session_routes(handlers.sessions))
        .merge(review_routes(handlers.reviews))
        .merge(participant_routes(handlers.participants))
        .layer(middleware::from_fn_with_state(validator, auth_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .merge(internal_routes(handlers.sweep))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(settings.request_timeout))
        .layer(cors_layer(&settings.cors_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(allowed)
    }
}
