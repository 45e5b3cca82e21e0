//! Operational endpoints outside the user API.
//!
//! - `POST /internal/sweep` - Runs one timeout sweep pass
//!
//! Authorized by the `x-sweep-token` header rather than a user token. The
//! route answers 404 when no trigger token is configured.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::adapters::http::error::{session_error_response, ErrorResponse};
use crate::application::handlers::session::{SweepTimeoutsCommand, SweepTimeoutsHandler};
use crate::domain::foundation::{CommandMetadata, Timestamp};

pub const SWEEP_TOKEN_HEADER: &str = "x-sweep-token";

#[derive(Clone)]
pub struct SweepTrigger {
    handler: Arc<SweepTimeoutsHandler>,
    token: Option<Arc<SecretString>>,
}

impl SweepTrigger {
    pub fn new(handler: Arc<SweepTimeoutsHandler>, token: Option<SecretString>) -> Self {
        Self {
            handler,
            token: token.map(Arc::new),
        }
    }

    fn authorizes(&self, headers: &HeaderMap) -> Option<bool> {
        let expected = self.token.as_ref()?;
        let presented = headers
            .get(SWEEP_TOKEN_HEADER)
            .map(|v| v.as_bytes())
            .unwrap_or_default();
        Some(bool::from(
            expected.expose_secret().as_bytes().ct_eq(presented),
        ))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub ended: Vec<String>,
    pub reconciled: Vec<String>,
}

pub fn internal_routes(trigger: SweepTrigger) -> Router {
    Router::new()
        .route("/internal/sweep", post(trigger_sweep))
        .with_state(trigger)
}

/// POST /internal/sweep
pub async fn trigger_sweep(State(trigger): State<SweepTrigger>, headers: HeaderMap) -> Response {
    match trigger.authorizes(&headers) {
        None => {
            return ErrorResponse::new("NOT_FOUND", "Sweep trigger is disabled")
                .with_status(StatusCode::NOT_FOUND)
        }
        Some(false) => {
            tracing::warn!("Rejected sweep trigger with bad token");
            return ErrorResponse::unauthorized("Invalid sweep token")
                .with_status(StatusCode::UNAUTHORIZED);
        }
        Some(true) => {}
    }

    let cmd = SweepTimeoutsCommand {
        now: Timestamp::now(),
    };
    match trigger
        .handler
        .handle(cmd, CommandMetadata::system("sweep-endpoint"))
        .await
    {
        Ok(report) => {
            let response = SweepResponse {
                ended: report.ended.iter().map(ToString::to_string).collect(),
                reconciled: report.reconciled.iter().map(ToString::to_string).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => session_error_response(e),
    }
}
