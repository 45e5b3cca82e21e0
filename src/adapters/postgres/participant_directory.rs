//! PostgreSQL implementation of ParticipantDirectory over `profiles`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::domain::participant::{Participant, ParticipantRole};
use crate::domain::review::RatingSummary;
use crate::ports::ParticipantDirectory;

use super::{column, query_failed};

#[derive(Clone)]
pub struct PostgresParticipantDirectory {
    pool: PgPool,
}

impl PostgresParticipantDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn not_found(id: &UserId) -> DomainError {
    DomainError::new(
        ErrorCode::ParticipantNotFound,
        format!("Participant not found: {}", id),
    )
}

#[async_trait]
impl ParticipantDirectory for PostgresParticipantDirectory {
    async fn find(&self, id: &UserId) -> Result<Option<Participant>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, role, display_name, avatar_url, is_online, in_service,
                   rating_average, review_count
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("fetch profile"))?;

        row.as_ref().map(row_to_participant).transpose()
    }

    async fn save(&self, participant: &Participant) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (
                user_id, role, display_name, avatar_url, is_online, in_service,
                rating_average, review_count, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
            ON CONFLICT (user_id) DO UPDATE SET
                role = EXCLUDED.role,
                display_name = EXCLUDED.display_name,
                avatar_url = EXCLUDED.avatar_url,
                is_online = EXCLUDED.is_online,
                in_service = EXCLUDED.in_service,
                rating_average = EXCLUDED.rating_average,
                review_count = EXCLUDED.review_count,
                updated_at = now()
            "#,
        )
        .bind(participant.id.as_str())
        .bind(participant.role.as_str())
        .bind(participant.display_name.as_deref())
        .bind(participant.avatar_url.as_deref())
        .bind(participant.is_online)
        .bind(participant.in_service)
        .bind(participant.rating_average)
        .bind(i32::try_from(participant.review_count).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await
        .map_err(query_failed("save profile"))?;

        Ok(())
    }

    async fn set_online(&self, id: &UserId, online: bool) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE profiles SET is_online = $2, updated_at = now() WHERE user_id = $1",
        )
        .bind(id.as_str())
        .bind(online)
        .execute(&self.pool)
        .await
        .map_err(query_failed("update presence"))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn set_in_service(&self, id: &UserId, in_service: bool) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE profiles SET in_service = $2, updated_at = now() WHERE user_id = $1",
        )
        .bind(id.as_str())
        .bind(in_service)
        .execute(&self.pool)
        .await
        .map_err(query_failed("update in_service"))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn list_in_service(&self) -> Result<Vec<UserId>, DomainError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT user_id FROM profiles WHERE in_service AND role = 'practitioner' ORDER BY user_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed("list in-service practitioners"))?;

        rows.into_iter()
            .map(|(id,)| UserId::new(id).map_err(DomainError::from))
            .collect()
    }

    async fn update_rating(
        &self,
        id: &UserId,
        summary: RatingSummary,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET rating_average = $2, review_count = $3, updated_at = now()
            WHERE user_id = $1
            "#,
        )
        .bind(id.as_str())
        .bind(summary.average)
        .bind(i32::try_from(summary.count).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await
        .map_err(query_failed("update rating"))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}

fn row_to_participant(row: &PgRow) -> Result<Participant, DomainError> {
    let user_id: String = column(row, "user_id")?;
    let role: String = column(row, "role")?;
    let review_count: i32 = column(row, "review_count")?;

    Ok(Participant {
        id: UserId::new(user_id)?,
        role: role.parse::<ParticipantRole>()?,
        display_name: column(row, "display_name")?,
        avatar_url: column(row, "avatar_url")?,
        is_online: column(row, "is_online")?,
        in_service: column(row, "in_service")?,
        rating_average: column(row, "rating_average")?,
        review_count: u32::try_from(review_count).unwrap_or(0),
    })
}
