//! Participant record as resolved from the directory.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserId;

use super::ParticipantRole;

/// A user known to the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: UserId,
    pub role: ParticipantRole,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,

    /// Practitioner-controlled availability.
    pub is_online: bool,

    /// True while bound to a non-ended session. Written only by the
    /// session lifecycle.
    pub in_service: bool,

    /// Mean of all review ratings, `None` until the first review.
    pub rating_average: Option<f64>,
    pub review_count: u32,
}

impl Participant {
    /// A guest with no presence or rating.
    pub fn guest(id: UserId) -> Self {
        Self {
            id,
            role: ParticipantRole::Guest,
            display_name: None,
            avatar_url: None,
            is_online: false,
            in_service: false,
            rating_average: None,
            review_count: 0,
        }
    }

    /// A practitioner, initially offline.
    pub fn practitioner(id: UserId) -> Self {
        Self {
            role: ParticipantRole::Practitioner,
            ..Self::guest(id)
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn online(mut self) -> Self {
        self.is_online = true;
        self
    }

    pub fn is_guest(&self) -> bool {
        self.role == ParticipantRole::Guest
    }

    pub fn is_practitioner(&self) -> bool {
        self.role == ParticipantRole::Practitioner
    }

    /// Online and not already serving another session.
    pub fn is_available(&self) -> bool {
        self.is_practitioner() && self.is_online && !self.in_service
    }
}
