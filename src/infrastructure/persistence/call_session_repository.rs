//! PostgreSQL implementation of the call session store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::domain::shared::{DomainError, Result, UniqueName};
use crate::domain::video_call::{
    CallMode, CallSession, CallSessionRepository, InsertOutcome, SessionStatus,
};

const ROOM_COLUMNS: &str = "id, unique_name, room_type, room_mode, room_status, user_id, \
     receiver_id, deleted_by_user, deleted_by_receiver, created_at, updated_at";

#[derive(FromRow)]
struct RoomRow {
    id: Uuid,
    unique_name: String,
    room_type: String,
    room_mode: String,
    room_status: String,
    user_id: Uuid,
    receiver_id: Uuid,
    deleted_by_user: bool,
    deleted_by_receiver: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RoomRow> for CallSession {
    type Error = DomainError;

    fn try_from(r: RoomRow) -> Result<Self> {
        Ok(CallSession {
            id: r.id,
            unique_name: UniqueName::parse(&r.unique_name)?,
            room_type: r.room_type,
            initiator_id: r.user_id,
            receiver_id: r.receiver_id,
            mode: CallMode::from_str(&r.room_mode).unwrap_or_else(|| {
                warn!("Room {} has unknown mode {:?}", r.id, r.room_mode);
                CallMode::DirectVideoCall
            }),
            status: SessionStatus::from_str(&r.room_status).unwrap_or(SessionStatus::Completed),
            hidden_by_initiator: r.deleted_by_user,
            hidden_by_receiver: r.deleted_by_receiver,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

pub(crate) fn db_error(e: sqlx::Error) -> DomainError {
    error!("Database error: {}", e);
    DomainError::Storage(e.to_string())
}

fn into_sessions(rows: Vec<RoomRow>) -> Result<Vec<CallSession>> {
    rows.into_iter().map(CallSession::try_from).collect()
}

pub struct PgCallSessionRepository {
    pool: PgPool,
}

impl PgCallSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn hide_flag(&self, id: Uuid, column: &str) -> Result<bool> {
        let sql = format!(
            "UPDATE rooms SET {column} = TRUE, updated_at = NOW() WHERE id = $1 AND NOT {column}"
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        debug!("Hid room {} via {} ({} rows)", id, column, result.rows_affected());
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CallSessionRepository for PgCallSessionRepository {
    async fn insert_if_absent(&self, session: &CallSession) -> Result<InsertOutcome> {
        debug!("Creating room {}", session.unique_name);

        let inserted: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO rooms (
                id, unique_name, room_type, room_mode, room_status,
                user_id, receiver_id, deleted_by_user, deleted_by_receiver,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (unique_name) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(session.id)
        .bind(session.unique_name.as_str())
        .bind(&session.room_type)
        .bind(session.mode.as_str())
        .bind(session.status.as_str())
        .bind(session.initiator_id)
        .bind(session.receiver_id)
        .bind(session.hidden_by_initiator)
        .bind(session.hidden_by_receiver)
        .bind(session.created_at)
        .bind(session.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        if inserted.is_some() {
            return Ok(InsertOutcome::Inserted(session.clone()));
        }

        match self.find_by_unique_name(session.unique_name.as_str()).await? {
            Some(existing) => Ok(InsertOutcome::Existing(existing)),
            // Winner was deleted between the two statements
            None => Err(DomainError::Storage(format!(
                "Room {} conflicted but could not be read back",
                session.unique_name
            ))),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CallSession>> {
        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1");
        let row: Option<RoomRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(CallSession::try_from).transpose()
    }

    async fn find_by_unique_name(&self, unique_name: &str) -> Result<Option<CallSession>> {
        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE unique_name = $1");
        let row: Option<RoomRow> = sqlx::query_as(&sql)
            .bind(unique_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(CallSession::try_from).transpose()
    }

    async fn update_status(&self, id: Uuid, status: SessionStatus) -> Result<()> {
        debug!("Setting room {} status to {}", id, status.as_str());

        sqlx::query("UPDATE rooms SET room_status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn list_initiated(
        &self,
        user_id: Uuid,
        mode: Option<CallMode>,
        limit: Option<i64>,
    ) -> Result<Vec<CallSession>> {
        let sql = format!(
            r#"
            SELECT {ROOM_COLUMNS} FROM rooms
            WHERE user_id = $1
              AND NOT deleted_by_user
              AND ($2::VARCHAR IS NULL OR room_mode = $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#
        );
        let rows: Vec<RoomRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(mode.map(|m| m.as_str()))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        into_sessions(rows)
    }

    async fn list_received(
        &self,
        user_id: Uuid,
        mode: Option<CallMode>,
        limit: Option<i64>,
    ) -> Result<Vec<CallSession>> {
        let sql = format!(
            r#"
            SELECT {ROOM_COLUMNS} FROM rooms
            WHERE receiver_id = $1
              AND NOT deleted_by_receiver
              AND ($2::VARCHAR IS NULL OR room_mode = $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#
        );
        let rows: Vec<RoomRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(mode.map(|m| m.as_str()))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        into_sessions(rows)
    }

    async fn hide_for_initiator(&self, id: Uuid) -> Result<bool> {
        self.hide_flag(id, "deleted_by_user").await
    }

    async fn hide_for_receiver(&self, id: Uuid) -> Result<bool> {
        self.hide_flag(id, "deleted_by_receiver").await
    }

    async fn hide_all_for_user(&self, user_id: Uuid) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let as_initiator = sqlx::query(
            "UPDATE rooms SET deleted_by_user = TRUE, updated_at = NOW() \
             WHERE user_id = $1 AND NOT deleted_by_user",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        let as_receiver = sqlx::query(
            "UPDATE rooms SET deleted_by_receiver = TRUE, updated_at = NOW() \
             WHERE receiver_id = $1 AND NOT deleted_by_receiver",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        Ok(as_initiator.rows_affected() + as_receiver.rows_affected())
    }
}
