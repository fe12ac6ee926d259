//! Video call API DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::SessionView;
use crate::domain::directory::UserProfile;
use crate::domain::video_call::HistoryEntrySummary;

/// Body of `POST /video-calls/{uname}`
#[derive(Debug, Default, Deserialize)]
pub struct StartCallRequest {
    /// Only needed when the session does not exist yet
    pub contact_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub mode: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct HideLogQuery {
    pub mode: Option<String>,
}

/// Provider room attributes plus the token and both parties
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionViewResponse {
    pub token_user: String,
    pub room_sid: String,
    pub audio_only: bool,
    pub status: String,
    pub created_date: Option<DateTime<Utc>>,
    pub update_at: Option<DateTime<Utc>>,
    pub account_sid: Option<String>,
    pub enable_turn: bool,
    pub unique_name: String,
    pub status_callback: Option<String>,
    pub status_callback_method: Option<String>,
    pub room_type: String,
    pub max_participants: Option<u32>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<u64>,
    pub url: Option<String>,
    pub links: serde_json::Value,
    pub user: UserProfile,
    pub receiver: Option<UserProfile>,
}

impl From<SessionView> for SessionViewResponse {
    fn from(view: SessionView) -> Self {
        let room = view.room;
        SessionViewResponse {
            token_user: view.token.jwt,
            room_sid: room.sid,
            audio_only: room.audio_only,
            status: room.status.as_str().to_string(),
            created_date: room.date_created,
            update_at: room.date_updated,
            account_sid: room.account_sid,
            enable_turn: room.enable_turn,
            unique_name: room.unique_name,
            status_callback: room.status_callback,
            status_callback_method: room.status_callback_method,
            room_type: room.room_type,
            max_participants: room.max_participants,
            end_time: room.end_time,
            duration: room.duration,
            url: room.url,
            links: room.links,
            user: view.user,
            receiver: view.counterpart,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntrySummary>,
}
