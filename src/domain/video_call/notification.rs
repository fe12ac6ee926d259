//! Call notifications
//!
//! Notifications are signalling artifacts only. They are never part of call
//! history, and losing one must not affect the session it describes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::directory::UserProfile;
use crate::domain::shared::Result;

/// Kind of call notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// New incoming call
    #[serde(rename = "Video Call")]
    IncomingCall,
    /// A party (re)joined an existing call
    #[serde(rename = "Accept Call")]
    AcceptCall,
    /// The call was ended
    #[serde(rename = "Reject Call")]
    EndCall,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::IncomingCall => "Video Call",
            NotificationKind::AcceptCall => "Accept Call",
            NotificationKind::EndCall => "Reject Call",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            NotificationKind::IncomingCall | NotificationKind::AcceptCall => "Calling",
            NotificationKind::EndCall => "End Call",
        }
    }

    fn message_suffix(&self) -> &'static str {
        match self {
            NotificationKind::IncomingCall | NotificationKind::AcceptCall => "is calling",
            NotificationKind::EndCall => "is ending call",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub kind: NotificationKind,
    pub notification_date: DateTime<Utc>,
    /// Recipient
    pub user_id: Uuid,
    pub room_id: Option<Uuid>,
}

impl Notification {
    pub fn for_call(kind: NotificationKind, sender_name: &str, user_id: Uuid, room_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: kind.title().to_string(),
            description: format!("{} {}.", sender_name, kind.message_suffix()),
            kind,
            notification_date: Utc::now(),
            user_id,
            room_id: Some(room_id),
        }
    }
}

/// Session details a push payload needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchContext {
    pub room_name: String,
    pub sender: UserProfile,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Push transport error: {0}")]
    Transport(String),

    #[error("Push lookup error: {0}")]
    Lookup(String),
}

/// Delivers notifications to devices, best effort
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        notification: &Notification,
        context: &DispatchContext,
    ) -> std::result::Result<(), DispatchError>;
}

/// Notification persistence
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<()>;

    /// Most recent notifications for a user
    async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<Notification>>;
}
