//! Directory lookups
//!
//! Users, contacts and groups are owned by other services. This context only
//! reads them to resolve call parties and to shape call history.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::shared::Result;

/// Public profile of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub profile_status: Option<String>,
    pub avatar_key: Option<String>,
    pub country: Option<String>,
}

impl UserProfile {
    /// Identity presented to the media provider
    pub fn provider_identity(&self) -> String {
        self.email.clone().unwrap_or_else(|| self.id.to_string())
    }
}

/// A saved contact: `owner_id` keeps `companion_id` in their address book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub companion_id: Uuid,
    pub name: String,
    pub avatar_key: Option<String>,
    pub blocked: bool,
}

/// Chat group owning group calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupProfile {
    pub id: Uuid,
    pub name: String,
    pub status: Option<String>,
}

/// Read-only directory port
#[async_trait]
pub trait Directory: Send + Sync {
    /// Find a user by id
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserProfile>>;

    /// Find one of `owner_id`'s contacts by contact id
    async fn find_contact(&self, owner_id: Uuid, contact_id: Uuid) -> Result<Option<Contact>>;

    /// Find the contact `owner_id` saved for `companion_id`
    async fn find_contact_for(&self, owner_id: Uuid, companion_id: Uuid)
        -> Result<Option<Contact>>;

    /// Find a group by id
    async fn find_group(&self, group_id: Uuid) -> Result<Option<GroupProfile>>;

    /// Contacts attached to a group, in membership order
    async fn group_contacts(&self, group_id: Uuid) -> Result<Vec<Contact>>;

    /// Push registration tokens of a user's devices
    async fn device_tokens(&self, user_id: Uuid) -> Result<Vec<String>>;

    /// True when the caller may not ring `receiver_id`
    ///
    /// Either the caller's own contact entry is marked blocked, or the
    /// receiver has blocked the caller in their address book.
    async fn is_blocked(&self, caller_id: Uuid, receiver_id: Uuid) -> Result<bool> {
        if let Some(own) = self.find_contact_for(caller_id, receiver_id).await? {
            if own.blocked {
                return Ok(true);
            }
        }
        Ok(self
            .find_contact_for(receiver_id, caller_id)
            .await?
            .map(|c| c.blocked)
            .unwrap_or(false))
    }
}
