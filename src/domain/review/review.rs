//! Review entity. Immutable once created.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ReviewId, SessionId, StarRating, Timestamp, UserId, ValidationError};

/// Maximum length for a review comment, in characters.
pub const MAX_COMMENT_LENGTH: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    id: ReviewId,
    session_id: SessionId,
    guest_id: UserId,
    practitioner_id: UserId,
    rating: StarRating,
    comment: Option<String>,
    created_at: Timestamp,
}

impl Review {
    /// Creates a review. The comment is trimmed; a blank comment is dropped.
    ///
    /// # Errors
    ///
    /// - `OutOfRange` if the comment exceeds `MAX_COMMENT_LENGTH` characters
    pub fn new(
        session_id: SessionId,
        guest_id: UserId,
        practitioner_id: UserId,
        rating: StarRating,
        comment: Option<String>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        if let Some(text) = &comment {
            let len = text.chars().count();
            if len > MAX_COMMENT_LENGTH {
                return Err(ValidationError::out_of_range(
                    "comment",
                    0,
                    MAX_COMMENT_LENGTH as i64,
                    len as i64,
                ));
            }
        }

        Ok(Self {
            id: ReviewId::new(),
            session_id,
            guest_id,
            practitioner_id,
            rating,
            comment,
            created_at: now,
        })
    }

    /// Reconstitute a review from persistence (no validation).
    pub fn reconstitute(
        id: ReviewId,
        session_id: SessionId,
        guest_id: UserId,
        practitioner_id: UserId,
        rating: StarRating,
        comment: Option<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            session_id,
            guest_id,
            practitioner_id,
            rating,
            comment,
            created_at,
        }
    }

    pub fn id(&self) -> &ReviewId {
        &self.id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn guest_id(&self) -> &UserId {
        &self.guest_id
    }

    pub fn practitioner_id(&self) -> &UserId {
        &self.practitioner_id
    }

    pub fn rating(&self) -> StarRating {
        self.rating
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }
}
