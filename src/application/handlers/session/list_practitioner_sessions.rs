//! ListPractitionerSessionsHandler - the practitioner's open sessions.

use std::sync::Arc;

use crate::domain::foundation::{CommandMetadata, SessionPhase, Timestamp, UserId};
use crate::domain::session::{Session, SessionError};

use super::coordinator::SessionCoordinator;
use super::SessionPolicy;

#[derive(Debug, Clone)]
pub struct ListPractitionerSessionsQuery {
    pub practitioner_id: UserId,
}

pub struct ListPractitionerSessionsHandler {
    coordinator: Arc<SessionCoordinator>,
    policy: SessionPolicy,
}

impl ListPractitionerSessionsHandler {
    pub fn new(coordinator: Arc<SessionCoordinator>, policy: SessionPolicy) -> Self {
        Self {
            coordinator,
            policy,
        }
    }

    /// Sessions of the caller that have not ended. Rows past their deadline
    /// are ended on the way out and left off the list.
    ///
    /// # Errors
    ///
    /// `NotPractitioner` unless the caller is a practitioner.
    pub async fn handle(
        &self,
        query: ListPractitionerSessionsQuery,
    ) -> Result<Vec<Session>, SessionError> {
        let is_practitioner = self
            .coordinator
            .directory()
            .find(&query.practitioner_id)
            .await?
            .map(|p| p.is_practitioner())
            .unwrap_or(false);
        if !is_practitioner {
            return Err(SessionError::NotPractitioner);
        }

        let stored = self
            .coordinator
            .sessions()
            .find_open_by_practitioner(&query.practitioner_id)
            .await?;

        let now = Timestamp::now();
        let metadata = CommandMetadata::for_user(query.practitioner_id.clone());
        let mut open = Vec::with_capacity(stored.len());
        for session in stored {
            let session = self
                .coordinator
                .expire_if_due(session, &self.policy, now, &metadata)
                .await?;
            if session.phase() != SessionPhase::Ended {
                open.push(session);
            }
        }
        Ok(open)
    }
}
