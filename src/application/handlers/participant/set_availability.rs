//! SetAvailabilityHandler - a practitioner goes online or offline.
//!
//! Runs under the practitioner lock so a toggle cannot interleave with an
//! admission check. Going offline leaves any open session running.

use std::sync::Arc;

use tracing::info;

use crate::application::handlers::session::SessionCoordinator;
use crate::domain::foundation::UserId;
use crate::domain::participant::Participant;
use crate::domain::session::SessionError;

#[derive(Debug, Clone)]
pub struct SetAvailabilityCommand {
    pub user_id: UserId,
    pub online: bool,
}

pub struct SetAvailabilityHandler {
    coordinator: Arc<SessionCoordinator>,
}

impl SetAvailabilityHandler {
    pub fn new(coordinator: Arc<SessionCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Returns the updated directory record.
    ///
    /// # Errors
    ///
    /// - `RoleMismatch` if the caller has no directory record
    /// - `NotPractitioner` for guests
    pub async fn handle(&self, cmd: SetAvailabilityCommand) -> Result<Participant, SessionError> {
        let directory = self.coordinator.directory();
        let caller = directory
            .find(&cmd.user_id)
            .await?
            .ok_or_else(|| SessionError::role_mismatch("caller has no participant record"))?;
        if !caller.is_practitioner() {
            return Err(SessionError::NotPractitioner);
        }

        let lease = self.coordinator.lock_practitioner(&cmd.user_id).await?;
        let updated = self.update(&cmd).await;
        self.coordinator.unlock(lease).await;
        let participant = updated?;

        info!(practitioner_id = %cmd.user_id, online = cmd.online, "Availability changed");
        Ok(participant)
    }

    async fn update(&self, cmd: &SetAvailabilityCommand) -> Result<Participant, SessionError> {
        let directory = self.coordinator.directory();
        directory.set_online(&cmd.user_id, cmd.online).await?;
        directory
            .find(&cmd.user_id)
            .await?
            .ok_or_else(|| SessionError::PractitionerNotFound(cmd.user_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::locks::InProcessKeyedLock;
    use crate::adapters::memory::{InMemoryParticipantDirectory, InMemorySessionRepository};

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn handler() -> SetAvailabilityHandler {
        let directory = Arc::new(InMemoryParticipantDirectory::with_participants([
            Participant::guest(uid("guest")),
            Participant::practitioner(uid("healer")),
        ]));
        SetAvailabilityHandler::new(Arc::new(SessionCoordinator::new(
            Arc::new(InMemorySessionRepository::new()),
            directory,
            Arc::new(InProcessKeyedLock::default()),
            Arc::new(InMemoryEventBus::new()),
        )))
    }

    #[tokio::test]
    async fn practitioner_toggles_online() {
        let handler = handler();

        let online = handler
            .handle(SetAvailabilityCommand {
                user_id: uid("healer"),
                online: true,
            })
            .await
            .unwrap();
        assert!(online.is_online);
        assert!(online.is_available());

        let offline = handler
            .handle(SetAvailabilityCommand {
                user_id: uid("healer"),
                online: false,
            })
            .await
            .unwrap();
        assert!(!offline.is_online);
    }

    #[tokio::test]
    async fn guest_cannot_set_availability() {
        let err = handler()
            .handle(SetAvailabilityCommand {
                user_id: uid("guest"),
                online: true,
            })
            .await
            .unwrap_err();

        assert_eq!(err, SessionError::NotPractitioner);
    }
}
