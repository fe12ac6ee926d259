//! Media provider port
//!
//! The provider owns rooms and media. This context only creates, fetches and
//! closes rooms, and asks for participant access tokens.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::shared::DomainError;

/// Provider-side errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Network failure, timeout or an error status from the provider
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    RoomNotFound(String),

    /// An in-progress room with the requested name already exists
    #[error("{0}")]
    RoomExists(String),

    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

impl From<ProviderError> for DomainError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::RoomNotFound(msg) => DomainError::ProviderRoomNotFound(msg),
            other => DomainError::ProviderUnavailable(other.to_string()),
        }
    }
}

/// Room status as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoomStatus {
    InProgress,
    Completed,
    Failed,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::InProgress => "in-progress",
            RoomStatus::Completed => "completed",
            RoomStatus::Failed => "failed",
        }
    }

    /// True once the provider has torn the room down
    pub fn is_ended(&self) -> bool {
        !matches!(self, RoomStatus::InProgress)
    }
}

/// Provider room representation, passed through to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRoom {
    pub sid: String,
    pub status: RoomStatus,
    #[serde(default)]
    pub audio_only: bool,
    pub date_created: Option<DateTime<Utc>>,
    pub date_updated: Option<DateTime<Utc>>,
    pub account_sid: Option<String>,
    #[serde(default)]
    pub enable_turn: bool,
    pub unique_name: String,
    pub status_callback: Option<String>,
    pub status_callback_method: Option<String>,
    #[serde(rename = "type")]
    pub room_type: String,
    pub max_participants: Option<u32>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<u64>,
    pub url: Option<String>,
    #[serde(default)]
    pub links: serde_json::Value,
}

/// Room creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoom {
    pub unique_name: String,
    /// Rooms are always group-capable, even for two parties
    pub room_type: String,
}

impl CreateRoom {
    pub fn group(unique_name: impl Into<String>) -> Self {
        Self {
            unique_name: unique_name.into(),
            room_type: "group".to_string(),
        }
    }
}

/// Signed participant token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub identity: String,
    pub room_name: String,
    pub jwt: String,
}

/// Media provider client
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProviderClient: Send + Sync {
    async fn create_room(&self, request: &CreateRoom) -> Result<ProviderRoom, ProviderError>;

    /// Fetch by unique name or sid
    async fn fetch_room(&self, name: &str) -> Result<ProviderRoom, ProviderError>;

    async fn update_room_status(
        &self,
        sid: &str,
        status: RoomStatus,
    ) -> Result<ProviderRoom, ProviderError>;

    async fn issue_token(&self, identity: &str, room_name: &str)
        -> Result<AccessToken, ProviderError>;
}
