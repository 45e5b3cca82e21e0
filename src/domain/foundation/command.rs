//! Command infrastructure for CQRS handlers.
//!
//! `CommandMetadata` is the context that flows through every command
//! handler: who issued the command (if anyone), the correlation id used in
//! logs and emitted events, and where the command came from.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Metadata context for command handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMetadata {
    /// The user executing this command. `None` for system commands such
    /// as the timeout sweep.
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<UserId>,

    /// Links related log lines and events across a single request.
    correlation_id: String,

    /// Source of this command (e.g., "api", "sweeper").
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl CommandMetadata {
    /// Metadata for a command issued by an authenticated user.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            correlation_id: Uuid::new_v4().to_string(),
            source: None,
        }
    }

    /// Metadata for a command issued by the system itself.
    pub fn system(source: impl Into<String>) -> Self {
        Self {
            user_id: None,
            correlation_id: Uuid::new_v4().to_string(),
            source: Some(source.into()),
        }
    }

    /// Builder: replace the generated correlation ID.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = id.into();
        self
    }

    /// Builder: add source identifier.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}
