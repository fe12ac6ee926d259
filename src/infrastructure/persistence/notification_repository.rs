//! PostgreSQL notification log

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::call_session_repository::db_error;
use crate::domain::shared::Result;
use crate::domain::video_call::{Notification, NotificationKind, NotificationRepository};

#[derive(FromRow)]
struct NotificationRow {
    id: Uuid,
    title: String,
    description: String,
    notification_type: String,
    notification_date: DateTime<Utc>,
    user_id: Uuid,
    room_id: Option<Uuid>,
}

fn kind_from_str(s: &str) -> NotificationKind {
    match s {
        "Accept Call" => NotificationKind::AcceptCall,
        "Reject Call" => NotificationKind::EndCall,
        _ => NotificationKind::IncomingCall,
    }
}

impl From<NotificationRow> for Notification {
    fn from(r: NotificationRow) -> Self {
        Notification {
            id: r.id,
            title: r.title,
            description: r.description,
            kind: kind_from_str(&r.notification_type),
            notification_date: r.notification_date,
            user_id: r.user_id,
            room_id: r.room_id,
        }
    }
}

pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications
            (id, title, description, notification_type, notification_date, user_id, room_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(notification.id)
        .bind(&notification.title)
        .bind(&notification.description)
        .bind(notification.kind.as_str())
        .bind(notification.notification_date)
        .bind(notification.user_id)
        .bind(notification.room_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        debug!("Stored notification {}", notification.id);
        Ok(())
    }

    async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            r#"
            SELECT id, title, description, notification_type, notification_date, user_id, room_id
            FROM notifications
            WHERE user_id = $1
            ORDER BY notification_date DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip_through_column_text() {
        for kind in [
            NotificationKind::IncomingCall,
            NotificationKind::AcceptCall,
            NotificationKind::EndCall,
        ] {
            assert_eq!(kind_from_str(kind.as_str()), kind);
        }
    }
}
