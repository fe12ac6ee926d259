//! In-process media provider
//!
//! Keeps rooms in a map and mints unsigned tokens. Backs the `memory`
//! feature and the API tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::video_call::{
    AccessToken, CreateRoom, MediaProviderClient, ProviderError, ProviderRoom, RoomStatus,
};

#[derive(Default)]
pub struct InMemoryMediaProvider {
    /// Keyed by unique name; a completed room stays until a new one replaces it
    rooms: RwLock<HashMap<String, ProviderRoom>>,
}

impl InMemoryMediaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rooms currently in progress
    pub async fn active_rooms(&self) -> usize {
        self.rooms
            .read()
            .await
            .values()
            .filter(|r| !r.status.is_ended())
            .count()
    }

    fn new_room(request: &CreateRoom) -> ProviderRoom {
        let now = Utc::now();
        let sid = format!("RM{}", Uuid::new_v4().simple());
        ProviderRoom {
            url: Some(format!("memory://rooms/{}", sid)),
            sid,
            status: RoomStatus::InProgress,
            audio_only: false,
            date_created: Some(now),
            date_updated: Some(now),
            account_sid: None,
            enable_turn: false,
            unique_name: request.unique_name.clone(),
            status_callback: None,
            status_callback_method: Some("POST".to_string()),
            room_type: request.room_type.clone(),
            max_participants: Some(50),
            end_time: None,
            duration: None,
            links: serde_json::Value::Null,
        }
    }
}

#[async_trait]
impl MediaProviderClient for InMemoryMediaProvider {
    async fn create_room(&self, request: &CreateRoom) -> Result<ProviderRoom, ProviderError> {
        let mut rooms = self.rooms.write().await;
        if let Some(existing) = rooms.get(&request.unique_name) {
            if !existing.status.is_ended() {
                return Err(ProviderError::RoomExists(format!(
                    "Room {} already exists",
                    request.unique_name
                )));
            }
        }
        let room = Self::new_room(request);
        rooms.insert(request.unique_name.clone(), room.clone());
        Ok(room)
    }

    async fn fetch_room(&self, name: &str) -> Result<ProviderRoom, ProviderError> {
        let rooms = self.rooms.read().await;
        rooms
            .get(name)
            .or_else(|| rooms.values().find(|r| r.sid == name))
            .cloned()
            .ok_or_else(|| ProviderError::RoomNotFound(format!("Room {} not found", name)))
    }

    async fn update_room_status(
        &self,
        sid: &str,
        status: RoomStatus,
    ) -> Result<ProviderRoom, ProviderError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .values_mut()
            .find(|r| r.sid == sid)
            .ok_or_else(|| ProviderError::RoomNotFound(format!("Room {} not found", sid)))?;

        let now = Utc::now();
        room.status = status;
        room.date_updated = Some(now);
        if status.is_ended() {
            room.end_time = Some(now);
            room.duration = room
                .date_created
                .map(|created| (now - created).num_seconds().max(0) as u64);
        }
        Ok(room.clone())
    }

    async fn issue_token(
        &self,
        identity: &str,
        room_name: &str,
    ) -> Result<AccessToken, ProviderError> {
        Ok(AccessToken {
            identity: identity.to_string(),
            room_name: room_name.to_string(),
            jwt: format!("memory.{}.{}", identity, room_name),
        })
    }
}
