//! PostgreSQL implementation of SessionRepository.
//!
//! `update_if_version` is a single `UPDATE ... WHERE version = $n`, so the
//! row is compare-and-set atomically by the database. The partial unique
//! index `sessions_one_open_per_practitioner` rejects a second open
//! session for a practitioner with a unique violation, surfaced as
//! `Conflict`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use crate::domain::foundation::{
    DomainError, ErrorCode, SessionId, SessionPhase, Timestamp, UserId,
};
use crate::domain::session::{EndReason, Session, TransportBinding};
use crate::ports::SessionRepository;

use super::{column, query_failed, unsigned};

const SELECT_COLUMNS: &str = r#"
    SELECT id, guest_id, practitioner_id, phase,
           acknowledged_practitioner, ready_guest, ready_practitioner,
           waiting_started_at, waiting_seconds, live_seconds,
           live_started_at, ended_at, end_reason,
           channel, guest_uid, practitioner_uid,
           version, created_at, updated_at
    FROM sessions
"#;

/// Partial unique index allowing one non-ended session per practitioner.
const ONE_OPEN_PER_PRACTITIONER: &str = "sessions_one_open_per_practitioner";

/// Only a clash on the open-session index means the practitioner is busy.
/// Any other constraint (a primary key clash included) is a plain failure.
fn blocks_second_open_session(constraint: Option<&str>) -> bool {
    constraint == Some(ONE_OPEN_PER_PRACTITIONER)
}

/// PostgreSQL implementation of SessionRepository.
#[derive(Clone)]
pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_all(
        &self,
        query: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<Vec<Session>, DomainError> {
        query
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed("list sessions"))?
            .iter()
            .map(row_to_session)
            .collect()
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn insert(&self, session: &Session) -> Result<(), DomainError> {
        let transport = session.transport();
        let result = sqlx::query(
            r#"
            INSERT INTO sessions (
                id, guest_id, practitioner_id, phase,
                acknowledged_practitioner, ready_guest, ready_practitioner,
                waiting_started_at, waiting_seconds, live_seconds,
                live_started_at, ended_at, end_reason,
                channel, guest_uid, practitioner_uid,
                version, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.guest_id().as_str())
        .bind(session.practitioner_id().as_str())
        .bind(session.phase().as_str())
        .bind(session.acknowledged_practitioner())
        .bind(session.ready_guest())
        .bind(session.ready_practitioner())
        .bind(session.waiting_started_at().as_datetime())
        .bind(session.waiting_seconds() as i64)
        .bind(session.live_seconds() as i64)
        .bind(session.live_started_at().map(|t| *t.as_datetime()))
        .bind(session.ended_at().map(|t| *t.as_datetime()))
        .bind(session.end_reason().map(|r| r.as_str()))
        .bind(&transport.channel)
        .bind(i64::from(transport.guest_uid))
        .bind(i64::from(transport.practitioner_uid))
        .bind(session.version())
        .bind(session.created_at().as_datetime())
        .bind(session.updated_at().as_datetime())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err))
                if blocks_second_open_session(db_err.constraint()) =>
            {
                Err(DomainError::new(
                    ErrorCode::Conflict,
                    "Practitioner already has an open session",
                )
                .with_detail("practitioner_id", session.practitioner_id().to_string()))
            }
            Err(e) => Err(query_failed("insert session")(e)),
        }
    }

    async fn update_if_version(
        &self,
        session: &Session,
        expected_version: i64,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET
                phase = $2,
                acknowledged_practitioner = $3,
                ready_guest = $4,
                ready_practitioner = $5,
                live_started_at = $6,
                ended_at = $7,
                end_reason = $8,
                version = $9,
                updated_at = $10
            WHERE id = $1 AND version = $11
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.phase().as_str())
        .bind(session.acknowledged_practitioner())
        .bind(session.ready_guest())
        .bind(session.ready_practitioner())
        .bind(session.live_started_at().map(|t| *t.as_datetime()))
        .bind(session.ended_at().map(|t| *t.as_datetime()))
        .bind(session.end_reason().map(|r| r.as_str()))
        .bind(session.version())
        .bind(session.updated_at().as_datetime())
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(query_failed("update session"))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists: Option<(i64,)> = sqlx::query_as("SELECT version FROM sessions WHERE id = $1")
            .bind(session.id().as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed("check session version"))?;

        match exists {
            Some(_) => Ok(false),
            None => Err(DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Session not found: {}", session.id()),
            )),
        }
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, DomainError> {
        let sql = format!("{} WHERE id = $1", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed("fetch session"))?;

        row.as_ref().map(row_to_session).transpose()
    }

    async fn find_by_phase(&self, phase: SessionPhase) -> Result<Vec<Session>, DomainError> {
        // Rows written before the phase rename still say room_timer.
        let sql = match phase {
            SessionPhase::Waiting => format!(
                "{} WHERE phase IN ('waiting', 'room_timer') ORDER BY created_at ASC",
                SELECT_COLUMNS
            ),
            _ => format!("{} WHERE phase = $1 ORDER BY created_at ASC", SELECT_COLUMNS),
        };
        let query = sqlx::query(&sql);
        let query = match phase {
            SessionPhase::Waiting => query,
            _ => query.bind(phase.as_str()),
        };
        self.fetch_all(query).await
    }

    async fn find_open_by_practitioner(
        &self,
        practitioner_id: &UserId,
    ) -> Result<Vec<Session>, DomainError> {
        let sql = format!(
            "{} WHERE practitioner_id = $1 AND phase <> 'ended' ORDER BY created_at DESC",
            SELECT_COLUMNS
        );
        self.fetch_all(sqlx::query(&sql).bind(practitioner_id.as_str()))
            .await
    }

    async fn find_by_participant(&self, user_id: &UserId) -> Result<Vec<Session>, DomainError> {
        let sql = format!(
            "{} WHERE guest_id = $1 OR practitioner_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        );
        self.fetch_all(sqlx::query(&sql).bind(user_id.as_str()))
            .await
    }
}

fn row_to_session(row: &PgRow) -> Result<Session, DomainError> {
    let id: uuid::Uuid = column(row, "id")?;
    let guest_id: String = column(row, "guest_id")?;
    let practitioner_id: String = column(row, "practitioner_id")?;
    let phase: String = column(row, "phase")?;
    let end_reason: Option<String> = column(row, "end_reason")?;

    let guest_uid: i64 = column(row, "guest_uid")?;
    let practitioner_uid: i64 = column(row, "practitioner_uid")?;
    let transport = TransportBinding {
        channel: column(row, "channel")?,
        guest_uid: uid(guest_uid)?,
        practitioner_uid: uid(practitioner_uid)?,
    };

    let timestamp = |name: &str| -> Result<Timestamp, DomainError> {
        column::<chrono::DateTime<chrono::Utc>>(row, name).map(Timestamp::from_datetime)
    };
    let optional_timestamp = |name: &str| -> Result<Option<Timestamp>, DomainError> {
        column::<Option<chrono::DateTime<chrono::Utc>>>(row, name)
            .map(|dt| dt.map(Timestamp::from_datetime))
    };

    Ok(Session::reconstitute(
        SessionId::from_uuid(id),
        UserId::new(guest_id)?,
        UserId::new(practitioner_id)?,
        phase.parse::<SessionPhase>()?,
        column(row, "acknowledged_practitioner")?,
        column(row, "ready_guest")?,
        column(row, "ready_practitioner")?,
        timestamp("waiting_started_at")?,
        unsigned(column(row, "waiting_seconds")?, "waiting_seconds")?,
        unsigned(column(row, "live_seconds")?, "live_seconds")?,
        optional_timestamp("live_started_at")?,
        optional_timestamp("ended_at")?,
        end_reason.map(|r| r.parse::<EndReason>()).transpose()?,
        transport,
        column(row, "version")?,
        timestamp("created_at")?,
        timestamp("updated_at")?,
    ))
}

fn uid(value: i64) -> Result<u32, DomainError> {
    u32::try_from(value).map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Transport uid out of range: {}", value),
        )
    })
}
