//! PostgreSQL directory lookups (users, contacts, groups, devices)

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::call_session_repository::db_error;
use crate::domain::directory::{Contact, Directory, GroupProfile, UserProfile};
use crate::domain::shared::Result;

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: Option<String>,
    profile_status: Option<String>,
    avatar_key: Option<String>,
    country: Option<String>,
}

impl From<UserRow> for UserProfile {
    fn from(r: UserRow) -> Self {
        UserProfile {
            id: r.id,
            name: r.name,
            email: r.email,
            profile_status: r.profile_status,
            avatar_key: r.avatar_key,
            country: r.country,
        }
    }
}

#[derive(FromRow)]
struct ContactRow {
    id: Uuid,
    user_id: Uuid,
    companion_id: Uuid,
    name: String,
    avatar_key: Option<String>,
    blocked: bool,
}

impl From<ContactRow> for Contact {
    fn from(r: ContactRow) -> Self {
        Contact {
            id: r.id,
            owner_id: r.user_id,
            companion_id: r.companion_id,
            name: r.name,
            avatar_key: r.avatar_key,
            blocked: r.blocked,
        }
    }
}

pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, name, email, profile_status, avatar_key, country FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Into::into))
    }

    async fn find_contact(&self, owner_id: Uuid, contact_id: Uuid) -> Result<Option<Contact>> {
        let row: Option<ContactRow> = sqlx::query_as(
            "SELECT id, user_id, companion_id, name, avatar_key, blocked FROM contacts \
             WHERE user_id = $1 AND id = $2",
        )
        .bind(owner_id)
        .bind(contact_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Into::into))
    }

    async fn find_contact_for(
        &self,
        owner_id: Uuid,
        companion_id: Uuid,
    ) -> Result<Option<Contact>> {
        let row: Option<ContactRow> = sqlx::query_as(
            "SELECT id, user_id, companion_id, name, avatar_key, blocked FROM contacts \
             WHERE user_id = $1 AND companion_id = $2 \
             ORDER BY created_at LIMIT 1",
        )
        .bind(owner_id)
        .bind(companion_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Into::into))
    }

    async fn find_group(&self, group_id: Uuid) -> Result<Option<GroupProfile>> {
        let row: Option<(Uuid, String, Option<String>)> =
            sqlx::query_as("SELECT id, name, status FROM groups WHERE id = $1")
                .bind(group_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(row.map(|(id, name, status)| GroupProfile { id, name, status }))
    }

    async fn group_contacts(&self, group_id: Uuid) -> Result<Vec<Contact>> {
        let rows: Vec<ContactRow> = sqlx::query_as(
            r#"
            SELECT c.id, c.user_id, c.companion_id, c.name, c.avatar_key, c.blocked
            FROM contacts c
            JOIN group_contacts gc ON gc.contact_id = c.id
            WHERE gc.group_id = $1
            ORDER BY gc.position, c.created_at
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn device_tokens(&self, user_id: Uuid) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT token FROM mobile_devices WHERE user_id = $1 ORDER BY created_at")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(rows.into_iter().map(|(token,)| token).collect())
    }
}
