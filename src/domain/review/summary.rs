//! Aggregate rating of a practitioner.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StarRating;

/// Arithmetic mean and count over all of a practitioner's reviews.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub count: u32,
}

impl RatingSummary {
    pub fn empty() -> Self {
        Self {
            average: None,
            count: 0,
        }
    }

    /// Exact mean of the given ratings.
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = StarRating>,
    {
        let (sum, count) = ratings
            .into_iter()
            .fold((0u64, 0u32), |(sum, count), r| {
                (sum + u64::from(r.value()), count + 1)
            });

        if count == 0 {
            return Self::empty();
        }

        Self {
            average: Some(sum as f64 / f64::from(count)),
            count,
        }
    }
}
