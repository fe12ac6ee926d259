//! Call history model
//!
//! History is read from three sources (sessions I placed, sessions I
//! received, group calls I took part in). They live in different relations
//! with different visibility predicates, so each is queried on its own and
//! the results are merged in memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::group::GroupCallSession;
use super::session::{CallMode, CallSession};

/// Which call shapes a history request wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeFilter {
    /// Direct video calls only, group calls excluded
    DirectOnly,
    /// Video calls of both shapes
    Video,
    /// No mode restriction
    All,
}

impl ModeFilter {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "direct" => Some(ModeFilter::DirectOnly),
            "video" => Some(ModeFilter::Video),
            "all" => Some(ModeFilter::All),
            _ => None,
        }
    }

    /// Mode restriction for the two direct streams
    pub fn direct_mode(&self) -> Option<CallMode> {
        match self {
            ModeFilter::DirectOnly | ModeFilter::Video => Some(CallMode::DirectVideoCall),
            ModeFilter::All => None,
        }
    }

    /// Mode restriction for the group stream, `None` when it is skipped
    pub fn group_stream(&self) -> Option<GroupStream> {
        match self {
            ModeFilter::DirectOnly => None,
            ModeFilter::Video => Some(GroupStream {
                mode: Some(CallMode::GroupVideoCall),
            }),
            ModeFilter::All => Some(GroupStream { mode: None }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupStream {
    pub mode: Option<CallMode>,
}

/// A history record, decided at query time
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEntry {
    Direct(CallSession),
    Group(GroupCallSession),
}

impl HistoryEntry {
    pub fn id(&self) -> Uuid {
        match self {
            HistoryEntry::Direct(s) => s.id,
            HistoryEntry::Group(g) => g.id,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            HistoryEntry::Direct(s) => s.created_at,
            HistoryEntry::Group(g) => g.created_at,
        }
    }
}

/// Concatenate the streams and order newest first
///
/// Ties on `created_at` fall back to the record id so the order is stable
/// across requests.
pub fn merge_streams(
    initiated: Vec<CallSession>,
    received: Vec<CallSession>,
    group: Vec<GroupCallSession>,
) -> Vec<HistoryEntry> {
    let mut entries: Vec<HistoryEntry> = initiated
        .into_iter()
        .chain(received)
        .map(HistoryEntry::Direct)
        .chain(group.into_iter().map(HistoryEntry::Group))
        .collect();

    entries.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.id().cmp(&b.id()))
    });
    entries
}

/// Viewer's saved contact for the other party of a direct call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSummary {
    pub contact_id: Uuid,
    pub user_id: Uuid,
    pub image_url: String,
    pub blocked: bool,
    pub name: String,
    pub country: Option<String>,
}

/// Group member preview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub contact_id: Uuid,
    pub image_url: String,
    pub blocked: bool,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectCallSummary {
    pub room_id: Uuid,
    pub room_mode: CallMode,
    pub created_at: DateTime<Utc>,
    pub participant_name: String,
    pub profile_status: String,
    pub receiver_image: String,
    pub call_status: String,
    pub contacts: Option<ContactSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCallSummary {
    pub room_id: Uuid,
    pub room_mode: CallMode,
    pub created_at: DateTime<Utc>,
    pub group_id: Uuid,
    pub profile_status: String,
    pub participant_name: String,
    pub receiver_image: Vec<String>,
    pub contacts: Vec<MemberSummary>,
}

/// Viewer-shaped history record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryEntrySummary {
    Direct(DirectCallSummary),
    Group(GroupCallSummary),
}
