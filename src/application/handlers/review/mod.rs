//! Review command and query handlers.

mod list_practitioner_reviews;
mod submit_review;

pub use list_practitioner_reviews::{
    ListPractitionerReviewsHandler, ListPractitionerReviewsQuery, PractitionerReviews,
};
pub use submit_review::{SubmitReviewCommand, SubmitReviewHandler, SubmitReviewResult};
