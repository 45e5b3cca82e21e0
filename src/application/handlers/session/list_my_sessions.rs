//! ListMySessionsHandler - session history of the caller.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::session::{Session, SessionError};

use super::coordinator::SessionCoordinator;

#[derive(Debug, Clone)]
pub struct ListMySessionsQuery {
    pub user_id: UserId,
}

pub struct ListMySessionsHandler {
    coordinator: Arc<SessionCoordinator>,
}

impl ListMySessionsHandler {
    pub fn new(coordinator: Arc<SessionCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Sessions where the caller is either party, newest first.
    pub async fn handle(&self, query: ListMySessionsQuery) -> Result<Vec<Session>, SessionError> {
        Ok(self
            .coordinator
            .sessions()
            .find_by_participant(&query.user_id)
            .await?)
    }
}
