//! PostgreSQL implementation of ReviewRepository.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use crate::domain::foundation::{
    DomainError, ErrorCode, ReviewId, SessionId, StarRating, Timestamp, UserId,
};
use crate::domain::review::Review;
use crate::ports::ReviewRepository;

use super::{column, query_failed};

const SELECT_COLUMNS: &str = r#"
    SELECT id, session_id, guest_id, practitioner_id, rating, comment, created_at
    FROM reviews
"#;

#[derive(Clone)]
pub struct PostgresReviewRepository {
    pool: PgPool,
}

impl PostgresReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PostgresReviewRepository {
    async fn insert(&self, review: &Review) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO reviews (id, session_id, guest_id, practitioner_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(review.id().as_uuid())
        .bind(review.session_id().as_uuid())
        .bind(review.guest_id().as_str())
        .bind(review.practitioner_id().as_str())
        .bind(i16::from(review.rating().value()))
        .bind(review.comment())
        .bind(review.created_at().as_datetime())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                DomainError::new(ErrorCode::Conflict, "Session has already been reviewed")
                    .with_detail("session_id", review.session_id().to_string()),
            ),
            Err(e) => Err(query_failed("insert review")(e)),
        }
    }

    async fn find_by_session(&self, session_id: &SessionId) -> Result<Option<Review>, DomainError> {
        let sql = format!("{} WHERE session_id = $1", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(session_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed("fetch review"))?;

        row.as_ref().map(row_to_review).transpose()
    }

    async fn find_by_practitioner(
        &self,
        practitioner_id: &UserId,
    ) -> Result<Vec<Review>, DomainError> {
        let sql = format!(
            "{} WHERE practitioner_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        );
        sqlx::query(&sql)
            .bind(practitioner_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed("list reviews"))?
            .iter()
            .map(row_to_review)
            .collect()
    }

    async fn ratings_for_practitioner(
        &self,
        practitioner_id: &UserId,
    ) -> Result<Vec<StarRating>, DomainError> {
        let rows: Vec<(i16,)> =
            sqlx::query_as("SELECT rating FROM reviews WHERE practitioner_id = $1")
                .bind(practitioner_id.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(query_failed("list ratings"))?;

        rows.into_iter().map(|(rating,)| to_rating(rating)).collect()
    }
}

fn to_rating(value: i16) -> Result<StarRating, DomainError> {
    let value = u8::try_from(value).map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Rating out of range: {}", value),
        )
    })?;
    Ok(StarRating::new(value)?)
}

fn row_to_review(row: &PgRow) -> Result<Review, DomainError> {
    let id: uuid::Uuid = column(row, "id")?;
    let session_id: uuid::Uuid = column(row, "session_id")?;
    let guest_id: String = column(row, "guest_id")?;
    let practitioner_id: String = column(row, "practitioner_id")?;
    let created_at: chrono::DateTime<chrono::Utc> = column(row, "created_at")?;

    Ok(Review::reconstitute(
        ReviewId::from_uuid(id),
        SessionId::from_uuid(session_id),
        UserId::new(guest_id)?,
        UserId::new(practitioner_id)?,
        to_rating(column(row, "rating")?)?,
        column(row, "comment")?,
        Timestamp::from_datetime(created_at),
    ))
}
