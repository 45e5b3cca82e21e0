//! In-memory participant directory.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::domain::participant::Participant;
use crate::domain::review::RatingSummary;
use crate::ports::ParticipantDirectory;

#[derive(Default)]
pub struct InMemoryParticipantDirectory {
    participants: RwLock<HashMap<UserId, Participant>>,
}

impl InMemoryParticipantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory pre-populated with `participants`.
    pub fn with_participants(participants: impl IntoIterator<Item = Participant>) -> Self {
        let map = participants
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Self {
            participants: RwLock::new(map),
        }
    }

    async fn modify<F>(&self, id: &UserId, f: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut Participant) + Send,
    {
        let mut participants = self.participants.write().await;
        let participant = participants
            .get_mut(id)
            .ok_or_else(|| not_found(id))?;
        f(participant);
        Ok(())
    }
}

fn not_found(id: &UserId) -> DomainError {
    DomainError::new(
        ErrorCode::ParticipantNotFound,
        format!("Participant not found: {}", id),
    )
}

#[async_trait]
impl ParticipantDirectory for InMemoryParticipantDirectory {
    async fn find(&self, id: &UserId) -> Result<Option<Participant>, DomainError> {
        Ok(self.participants.read().await.get(id).cloned())
    }

    async fn save(&self, participant: &Participant) -> Result<(), DomainError> {
        self.participants
            .write()
            .await
            .insert(participant.id.clone(), participant.clone());
        Ok(())
    }

    async fn set_online(&self, id: &UserId, online: bool) -> Result<(), DomainError> {
        self.modify(id, |p| p.is_online = online).await
    }

    async fn set_in_service(&self, id: &UserId, in_service: bool) -> Result<(), DomainError> {
        self.modify(id, |p| p.in_service = in_service).await
    }

    async fn list_in_service(&self) -> Result<Vec<UserId>, DomainError> {
        let mut ids: Vec<UserId> = self
            .participants
            .read()
            .await
            .values()
            .filter(|p| p.in_service)
            .map(|p| p.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn update_rating(
        &self,
        id: &UserId,
        summary: RatingSummary,
    ) -> Result<(), DomainError> {
        self.modify(id, |p| {
            p.rating_average = summary.average;
            p.review_count = summary.count;
        })
        .await
    }
}
