//! InitProfileHandler - a signed-up user picks a role.
//!
//! This is the only place a directory record is created; logging in never
//! creates one. The role is fixed once chosen. Repeating the call with the
//! same role only refreshes the display fields.

use std::sync::Arc;

use tracing::info;

use crate::application::handlers::session::SessionCoordinator;
use crate::domain::foundation::UserId;
use crate::domain::participant::{Participant, ParticipantRole};
use crate::domain::session::SessionError;

const MAX_DISPLAY_NAME_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct InitProfileCommand {
    pub user_id: UserId,
    pub role: ParticipantRole,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

pub struct InitProfileHandler {
    coordinator: Arc<SessionCoordinator>,
}

impl InitProfileHandler {
    pub fn new(coordinator: Arc<SessionCoordinator>) -> Self {
        Self { coordinator }
    }

    /// # Errors
    ///
    /// - `RoleMismatch` if the caller already holds the other role
    /// - `ValidationFailed` for an over-long display name
    pub async fn handle(&self, cmd: InitProfileCommand) -> Result<Participant, SessionError> {
        let display_name = normalize(cmd.display_name);
        if let Some(name) = &display_name {
            if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
                return Err(SessionError::validation(
                    "display_name",
                    format!("must be at most {} characters", MAX_DISPLAY_NAME_CHARS),
                ));
            }
        }
        let avatar_url = normalize(cmd.avatar_url);

        // Practitioner records carry presence flags written under this lock.
        let lease = match cmd.role {
            ParticipantRole::Practitioner => {
                Some(self.coordinator.lock_practitioner(&cmd.user_id).await?)
            }
            ParticipantRole::Guest => None,
        };
        let saved = self
            .upsert(&cmd.user_id, cmd.role, display_name, avatar_url)
            .await;
        if let Some(lease) = lease {
            self.coordinator.unlock(lease).await;
        }
        let (participant, created) = saved?;

        if created {
            info!(user_id = %participant.id, role = %participant.role, "Profile initialized");
        }
        Ok(participant)
    }

    async fn upsert(
        &self,
        user_id: &UserId,
        role: ParticipantRole,
        display_name: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<(Participant, bool), SessionError> {
        let directory = self.coordinator.directory();
        let existing = directory.find(user_id).await?;

        let (mut participant, created) = match existing {
            Some(existing) if existing.role != role => {
                return Err(SessionError::role_mismatch(format!(
                    "already registered as {}",
                    existing.role
                )))
            }
            Some(existing) => (existing, false),
            None => {
                let fresh = match role {
                    ParticipantRole::Guest => Participant::guest(user_id.clone()),
                    ParticipantRole::Practitioner => Participant::practitioner(user_id.clone()),
                };
                (fresh, true)
            }
        };

        if display_name.is_some() {
            participant.display_name = display_name;
        }
        if avatar_url.is_some() {
            participant.avatar_url = avatar_url;
        }

        directory.save(&participant).await?;
        Ok((participant, created))
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::locks::InProcessKeyedLock;
    use crate::adapters::memory::{InMemoryParticipantDirectory, InMemorySessionRepository};
    use crate::ports::ParticipantDirectory;

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn handler() -> (InitProfileHandler, Arc<InMemoryParticipantDirectory>) {
        let directory = Arc::new(InMemoryParticipantDirectory::new());
        let coordinator = Arc::new(SessionCoordinator::new(
            Arc::new(InMemorySessionRepository::new()),
            directory.clone(),
            Arc::new(InProcessKeyedLock::default()),
            Arc::new(InMemoryEventBus::new()),
        ));
        (InitProfileHandler::new(coordinator), directory)
    }

    fn init(user: &str, role: ParticipantRole, name: Option<&str>) -> InitProfileCommand {
        InitProfileCommand {
            user_id: uid(user),
            role,
            display_name: name.map(str::to_string),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn creates_practitioner_offline() {
        let (handler, directory) = handler();

        let created = handler
            .handle(init("healer", ParticipantRole::Practitioner, Some("  Hal ")))
            .await
            .unwrap();

        assert!(created.is_practitioner());
        assert!(!created.is_online);
        assert_eq!(created.display_name.as_deref(), Some("Hal"));
        assert_eq!(directory.find(&uid("healer")).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn repeat_keeps_presence_and_updates_name() {
        let (handler, directory) = handler();
        handler
            .handle(init("healer", ParticipantRole::Practitioner, None))
            .await
            .unwrap();
        directory.set_online(&uid("healer"), true).await.unwrap();

        let again = handler
            .handle(init("healer", ParticipantRole::Practitioner, Some("Hal")))
            .await
            .unwrap();

        assert!(again.is_online);
        assert_eq!(again.display_name.as_deref(), Some("Hal"));
    }

    #[tokio::test]
    async fn role_cannot_change() {
        let (handler, _) = handler();
        handler
            .handle(init("user", ParticipantRole::Guest, None))
            .await
            .unwrap();

        let err = handler
            .handle(init("user", ParticipantRole::Practitioner, None))
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::RoleMismatch(_)));
    }

    #[tokio::test]
    async fn over_long_name_is_invalid() {
        let (handler, _) = handler();
        let name = "x".repeat(MAX_DISPLAY_NAME_CHARS + 1);

        let err = handler
            .handle(init("user", ParticipantRole::Guest, Some(&name)))
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::ValidationFailed { .. }));
    }
}
