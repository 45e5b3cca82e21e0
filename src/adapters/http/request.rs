//! Helpers shared by handlers for reading request context.

use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;

use crate::domain::foundation::{CommandMetadata, SessionId, UserId};

use super::error::ErrorResponse;

/// Header set by the request-id layer and echoed back to the client.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Metadata for a user command, correlated by the request id when present.
pub fn command_metadata(user_id: &UserId, headers: &HeaderMap) -> CommandMetadata {
    let metadata = CommandMetadata::for_user(user_id.clone()).with_source("api");
    match headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()) {
        Some(request_id) => metadata.with_correlation_id(request_id),
        None => metadata,
    }
}

pub fn parse_session_id(raw: &str) -> Result<SessionId, Response> {
    raw.parse::<SessionId>().map_err(|_| {
        ErrorResponse::bad_request(format!("Invalid session ID: {}", raw))
            .with_status(StatusCode::BAD_REQUEST)
    })
}

pub fn parse_user_id(raw: impl Into<String>, field: &str) -> Result<UserId, Response> {
    UserId::new(raw).map_err(|_| {
        ErrorResponse::bad_request(format!("{} must not be empty", field))
            .with_status(StatusCode::BAD_REQUEST)
    })
}
