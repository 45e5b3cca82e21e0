//! SubmitReviewHandler - the guest rates an ended session.
//!
//! The review insert and the rating recompute run under the practitioner
//! lock so that two reviews landing together cannot store a stale mean.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::foundation::{
    CommandMetadata, EventEnvelope, EventId, SessionId, SessionPhase, StarRating, Timestamp,
    UserId,
};
use crate::domain::review::{RatingSummary, Review, ReviewError, ReviewSubmitted};
use crate::ports::{
    practitioner_lock_key, EventPublisher, KeyedLock, ParticipantDirectory, ReviewRepository,
    SessionRepository,
};

#[derive(Debug, Clone)]
pub struct SubmitReviewCommand {
    pub session_id: SessionId,
    pub guest_id: UserId,
    pub rating: u8,
    pub comment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SubmitReviewResult {
    pub review: Review,

    /// The practitioner's new aggregate. `None` if the recompute failed;
    /// the next review recomputes from scratch.
    pub summary: Option<RatingSummary>,
}

pub struct SubmitReviewHandler {
    sessions: Arc<dyn SessionRepository>,
    reviews: Arc<dyn ReviewRepository>,
    directory: Arc<dyn ParticipantDirectory>,
    locks: Arc<dyn KeyedLock>,
    publisher: Arc<dyn EventPublisher>,
}

impl SubmitReviewHandler {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        reviews: Arc<dyn ReviewRepository>,
        directory: Arc<dyn ParticipantDirectory>,
        locks: Arc<dyn KeyedLock>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            sessions,
            reviews,
            directory,
            locks,
            publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: SubmitReviewCommand,
        metadata: CommandMetadata,
    ) -> Result<SubmitReviewResult, ReviewError> {
        let rating = StarRating::new(cmd.rating)?;

        let session = self
            .sessions
            .find_by_id(&cmd.session_id)
            .await?
            .ok_or(ReviewError::SessionNotFound(cmd.session_id))?;

        if session.guest_id() != &cmd.guest_id {
            return Err(ReviewError::NotSessionGuest);
        }
        if session.phase() != SessionPhase::Ended {
            return Err(ReviewError::SessionNotEnded(session.phase()));
        }
        if self.reviews.find_by_session(&cmd.session_id).await?.is_some() {
            return Err(ReviewError::AlreadyReviewed);
        }

        let review = Review::new(
            cmd.session_id,
            cmd.guest_id,
            session.practitioner_id().clone(),
            rating,
            cmd.comment,
            Timestamp::now(),
        )?;

        let lease = self
            .locks
            .acquire(&practitioner_lock_key(review.practitioner_id()))
            .await?;
        let stored = self.store(&review).await;
        if let Err(err) = self.locks.release(lease).await {
            warn!(error = %err, "Failed to release practitioner lock");
        }
        let summary = stored?;

        info!(
            session_id = %review.session_id(),
            practitioner_id = %review.practitioner_id(),
            rating = review.rating().value(),
            "Review submitted"
        );

        if let Some(summary) = summary {
            self.publish(&review, summary, &metadata).await;
        }

        Ok(SubmitReviewResult { review, summary })
    }

    /// Inserts the review and refreshes the practitioner's aggregate.
    async fn store(&self, review: &Review) -> Result<Option<RatingSummary>, ReviewError> {
        self.reviews.insert(review).await?;

        match self.recompute(review.practitioner_id()).await {
            Ok(summary) => Ok(Some(summary)),
            Err(err) => {
                error!(
                    practitioner_id = %review.practitioner_id(),
                    error = %err,
                    "Review stored but rating recompute failed"
                );
                Ok(None)
            }
        }
    }

    async fn recompute(&self, practitioner_id: &UserId) -> Result<RatingSummary, ReviewError> {
        let ratings = self.reviews.ratings_for_practitioner(practitioner_id).await?;
        let summary = RatingSummary::from_ratings(ratings);
        self.directory.update_rating(practitioner_id, summary).await?;
        Ok(summary)
    }

    async fn publish(&self, review: &Review, summary: RatingSummary, metadata: &CommandMetadata) {
        let event = ReviewSubmitted {
            event_id: EventId::new(),
            review_id: *review.id(),
            session_id: *review.session_id(),
            practitioner_id: review.practitioner_id().clone(),
            rating: review.rating().value(),
            rating_average: summary.average.unwrap_or_default(),
            review_count: summary.count,
            submitted_at: *review.created_at(),
        };

        let envelope = match EventEnvelope::from_event(&event) {
            Ok(envelope) => envelope
                .with_correlation_id(metadata.correlation_id())
                .with_user_id(review.guest_id().as_str()),
            Err(err) => {
                error!(error = %err, "Failed to build review event");
                return;
            }
        };

        if let Err(err) = self.publisher.publish(envelope).await {
            warn!(error = %err, "Failed to publish review event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::locks::InProcessKeyedLock;
    use crate::adapters::memory::{
        InMemoryParticipantDirectory, InMemoryReviewRepository, InMemorySessionRepository,
    };
    use crate::domain::participant::Participant;
    use crate::domain::session::{EndReason, Session, SessionPatch};

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    struct Fixture {
        sessions: Arc<InMemorySessionRepository>,
        directory: Arc<InMemoryParticipantDirectory>,
        bus: Arc<InMemoryEventBus>,
        handler: SubmitReviewHandler,
    }

    fn fixture() -> Fixture {
        let sessions = Arc::new(InMemorySessionRepository::new());
        let directory = Arc::new(InMemoryParticipantDirectory::with_participants([
            Participant::guest(uid("guest")),
            Participant::practitioner(uid("healer")),
        ]));
        let bus = Arc::new(InMemoryEventBus::new());
        let handler = SubmitReviewHandler::new(
            sessions.clone(),
            Arc::new(InMemoryReviewRepository::new()),
            directory.clone(),
            Arc::new(InProcessKeyedLock::default()),
            bus.clone(),
        );
        Fixture {
            sessions,
            directory,
            bus,
            handler,
        }
    }

    async fn session(fx: &Fixture, ended: bool) -> Session {
        let now = Timestamp::now();
        let session =
            Session::new(SessionId::new(), uid("guest"), uid("healer"), 120, 900, now).unwrap();
        fx.sessions.insert(&session).await.unwrap();
        if !ended {
            return session;
        }
        let next = session
            .apply(&SessionPatch::end(EndReason::EndedByGuest, now), now)
            .unwrap();
        assert!(fx.sessions.update_if_version(&next, session.version()).await.unwrap());
        next
    }

    fn review(session: &Session, guest: &str, rating: u8) -> SubmitReviewCommand {
        SubmitReviewCommand {
            session_id: *session.id(),
            guest_id: uid(guest),
            rating,
            comment: Some("  lovely  ".to_string()),
        }
    }

    async fn submit(fx: &Fixture, cmd: SubmitReviewCommand) -> Result<SubmitReviewResult, ReviewError> {
        fx.handler
            .handle(cmd, CommandMetadata::for_user(uid("guest")))
            .await
    }

    #[tokio::test]
    async fn ratings_average_to_exact_mean() {
        let fx = fixture();
        let first = session(&fx, true).await;
        let second = session(&fx, true).await;

        submit(&fx, review(&first, "guest", 4)).await.unwrap();
        let result = submit(&fx, review(&second, "guest", 5)).await.unwrap();

        assert_eq!(result.summary.unwrap().average, Some(4.5));
        assert_eq!(result.review.comment(), Some("lovely"));
        let healer = fx.directory.find(&uid("healer")).await.unwrap().unwrap();
        assert_eq!(healer.rating_average, Some(4.5));
        assert_eq!(healer.review_count, 2);
        assert_eq!(fx.bus.event_types().await.len(), 2);
    }

    #[tokio::test]
    async fn open_session_cannot_be_reviewed() {
        let fx = fixture();
        let open = session(&fx, false).await;

        let err = submit(&fx, review(&open, "guest", 5)).await.unwrap_err();

        assert_eq!(err, ReviewError::SessionNotEnded(SessionPhase::Waiting));
    }

    #[tokio::test]
    async fn only_the_guest_may_review() {
        let fx = fixture();
        let ended = session(&fx, true).await;

        let err = submit(&fx, review(&ended, "healer", 5)).await.unwrap_err();

        assert_eq!(err, ReviewError::NotSessionGuest);
    }

    #[tokio::test]
    async fn second_review_is_rejected() {
        let fx = fixture();
        let ended = session(&fx, true).await;

        submit(&fx, review(&ended, "guest", 3)).await.unwrap();
        let err = submit(&fx, review(&ended, "guest", 5)).await.unwrap_err();

        assert_eq!(err, ReviewError::AlreadyReviewed);
    }

    #[tokio::test]
    async fn rating_out_of_range_is_invalid() {
        let fx = fixture();
        let ended = session(&fx, true).await;

        let err = submit(&fx, review(&ended, "guest", 6)).await.unwrap_err();

        assert!(matches!(err, ReviewError::ValidationFailed { .. }));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let fx = fixture();
        let id = SessionId::new();

        let err = submit(
            &fx,
            SubmitReviewCommand {
                session_id: id,
                guest_id: uid("guest"),
                rating: 5,
                comment: None,
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err, ReviewError::SessionNotFound(id));
    }
}
