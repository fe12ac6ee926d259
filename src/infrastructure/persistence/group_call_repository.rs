//! PostgreSQL implementation of the group call store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::call_session_repository::db_error;
use crate::domain::shared::Result;
use crate::domain::video_call::{CallMode, GroupCallRepository, GroupCallSession, Participation};

#[derive(FromRow)]
struct GroupRoomRow {
    id: Uuid,
    group_id: Uuid,
    room_mode: String,
    created_at: DateTime<Utc>,
}

impl From<GroupRoomRow> for GroupCallSession {
    fn from(r: GroupRoomRow) -> Self {
        GroupCallSession {
            id: r.id,
            group_id: r.group_id,
            mode: CallMode::from_str(&r.room_mode).unwrap_or(CallMode::GroupVideoCall),
            created_at: r.created_at,
        }
    }
}

pub struct PgGroupCallRepository {
    pool: PgPool,
}

impl PgGroupCallRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupCallRepository for PgGroupCallRepository {
    async fn create(&self, session: &GroupCallSession, member_ids: &[Uuid]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            "INSERT INTO group_rooms (id, group_id, room_mode, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(session.id)
        .bind(session.group_id)
        .bind(session.mode.as_str())
        .bind(session.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        for user_id in member_ids {
            let participation = Participation::new(session.id, *user_id);
            sqlx::query(
                "INSERT INTO participants (id, group_room_id, user_id, deleted) \
                 VALUES ($1, $2, $3, FALSE) ON CONFLICT (group_room_id, user_id) DO NOTHING",
            )
            .bind(participation.id)
            .bind(participation.group_room_id)
            .bind(participation.user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        debug!(
            "Created group room {} with {} participants",
            session.id,
            member_ids.len()
        );
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupCallSession>> {
        let row: Option<GroupRoomRow> = sqlx::query_as(
            "SELECT id, group_id, room_mode, created_at FROM group_rooms WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Into::into))
    }

    async fn list_for_participant(
        &self,
        user_id: Uuid,
        mode: Option<CallMode>,
        limit: Option<i64>,
    ) -> Result<Vec<GroupCallSession>> {
        let rows: Vec<GroupRoomRow> = sqlx::query_as(
            r#"
            SELECT g.id, g.group_id, g.room_mode, g.created_at
            FROM group_rooms g
            JOIN participants p ON p.group_room_id = g.id
            WHERE p.user_id = $1
              AND NOT p.deleted
              AND ($2::VARCHAR IS NULL OR g.room_mode = $2)
            ORDER BY g.created_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(mode.map(|m| m.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn hide_participation(&self, group_room_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE participants SET deleted = TRUE \
             WHERE group_room_id = $1 AND user_id = $2 AND NOT deleted",
        )
        .bind(group_room_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn hide_all_for_user(&self, user_id: Uuid) -> Result<u64> {
        let result =
            sqlx::query("UPDATE participants SET deleted = TRUE WHERE user_id = $1 AND NOT deleted")
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(result.rows_affected())
    }
}
