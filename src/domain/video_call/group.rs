//! Group call session and per-member participation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::CallMode;

/// A call among the members of a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCallSession {
    pub id: Uuid,
    pub group_id: Uuid,
    pub mode: CallMode,
    pub created_at: DateTime<Utc>,
}

impl GroupCallSession {
    pub fn new(group_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            mode: CallMode::GroupVideoCall,
            created_at: Utc::now(),
        }
    }
}

/// One member's presence on a group call, with its own hidden flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participation {
    pub id: Uuid,
    pub group_room_id: Uuid,
    pub user_id: Uuid,
    pub hidden: bool,
}

impl Participation {
    pub fn new(group_room_id: Uuid, user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_room_id,
            user_id,
            hidden: false,
        }
    }
}
