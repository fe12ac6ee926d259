//! Call session (room) entity
//!
//! A `CallSession` is the local mirror of one provider room. The two hidden
//! flags are independent: each party only ever flips its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::shared::UniqueName;

/// Call classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallMode {
    #[serde(rename = "Video Call")]
    DirectVideoCall,
    #[serde(rename = "Group Video Call")]
    GroupVideoCall,
}

impl CallMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallMode::DirectVideoCall => "Video Call",
            CallMode::GroupVideoCall => "Group Video Call",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Video Call" => Some(CallMode::DirectVideoCall),
            "Group Video Call" => Some(CallMode::GroupVideoCall),
            _ => None,
        }
    }
}

/// Local lifecycle status, mirrors the provider room status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in-progress",
            SessionStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in-progress" => Some(SessionStatus::InProgress),
            "completed" => Some(SessionStatus::Completed),
            _ => None,
        }
    }
}

/// Which side of a direct call a viewer is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallDirection {
    Outgoing,
    Incoming,
}

impl CallDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallDirection::Outgoing => "Outgoing",
            CallDirection::Incoming => "Incoming",
        }
    }
}

/// Party role of a user on a direct session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyRole {
    Initiator,
    Receiver,
}

/// One direct video call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSession {
    pub id: Uuid,
    pub unique_name: UniqueName,
    /// Provider room type as reported at creation
    pub room_type: String,
    pub initiator_id: Uuid,
    pub receiver_id: Uuid,
    pub mode: CallMode,
    pub status: SessionStatus,
    pub hidden_by_initiator: bool,
    pub hidden_by_receiver: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CallSession {
    /// New in-progress direct session
    pub fn new(
        unique_name: UniqueName,
        room_type: String,
        initiator_id: Uuid,
        receiver_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            unique_name,
            room_type,
            initiator_id,
            receiver_id,
            mode: CallMode::DirectVideoCall,
            status: SessionStatus::InProgress,
            hidden_by_initiator: false,
            hidden_by_receiver: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn role_of(&self, user_id: Uuid) -> Option<PartyRole> {
        if user_id == self.initiator_id {
            Some(PartyRole::Initiator)
        } else if user_id == self.receiver_id {
            Some(PartyRole::Receiver)
        } else {
            None
        }
    }

    /// The party that is not `user_id`
    pub fn counterpart_of(&self, user_id: Uuid) -> Uuid {
        if user_id == self.initiator_id {
            self.receiver_id
        } else {
            self.initiator_id
        }
    }

    pub fn direction_for(&self, viewer_id: Uuid) -> CallDirection {
        if viewer_id == self.initiator_id {
            CallDirection::Outgoing
        } else {
            CallDirection::Incoming
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    pub fn mark_completed(&mut self) {
        self.status = SessionStatus::Completed;
        self.updated_at = Utc::now();
    }

    /// Hide for one role only
    pub fn hide_for(&mut self, role: PartyRole) {
        match role {
            PartyRole::Initiator => self.hidden_by_initiator = true,
            PartyRole::Receiver => self.hidden_by_receiver = true,
        }
        self.updated_at = Utc::now();
    }
}
