//! Soft-delete store interfaces
//!
//! Defined here as ports, implemented in the infrastructure layer. Hide
//! operations only ever touch the flag belonging to the requesting party.

use async_trait::async_trait;
use uuid::Uuid;

use super::group::{GroupCallSession, Participation};
use super::session::{CallMode, CallSession, SessionStatus};
use crate::domain::shared::Result;

/// Result of a find-or-create on `unique_name`
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The given session was stored
    Inserted(CallSession),
    /// Another session already holds the name; it is returned unchanged
    Existing(CallSession),
}

/// Direct call sessions
#[async_trait]
pub trait CallSessionRepository: Send + Sync {
    /// Atomically store `session` unless its unique name is taken
    async fn insert_if_absent(&self, session: &CallSession) -> Result<InsertOutcome>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CallSession>>;

    async fn find_by_unique_name(&self, unique_name: &str) -> Result<Option<CallSession>>;

    async fn update_status(&self, id: Uuid, status: SessionStatus) -> Result<()>;

    /// Sessions `user_id` placed and has not hidden, newest first
    async fn list_initiated(
        &self,
        user_id: Uuid,
        mode: Option<CallMode>,
        limit: Option<i64>,
    ) -> Result<Vec<CallSession>>;

    /// Sessions `user_id` received and has not hidden, newest first
    async fn list_received(
        &self,
        user_id: Uuid,
        mode: Option<CallMode>,
        limit: Option<i64>,
    ) -> Result<Vec<CallSession>>;

    /// Set `hidden_by_initiator`; false when nothing changed
    async fn hide_for_initiator(&self, id: Uuid) -> Result<bool>;

    /// Set `hidden_by_receiver`; false when nothing changed
    async fn hide_for_receiver(&self, id: Uuid) -> Result<bool>;

    /// Hide every visible session for `user_id` in whichever role they hold
    async fn hide_all_for_user(&self, user_id: Uuid) -> Result<u64>;
}

/// Group call sessions and their participations
#[async_trait]
pub trait GroupCallRepository: Send + Sync {
    /// Store a group session with one participation per present member
    async fn create(&self, session: &GroupCallSession, member_ids: &[Uuid]) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupCallSession>>;

    /// Group sessions where `user_id` has a visible participation, newest first
    async fn list_for_participant(
        &self,
        user_id: Uuid,
        mode: Option<CallMode>,
        limit: Option<i64>,
    ) -> Result<Vec<GroupCallSession>>;

    /// Hide `user_id`'s own participation; false when nothing changed
    async fn hide_participation(&self, group_room_id: Uuid, user_id: Uuid) -> Result<bool>;

    async fn hide_all_for_user(&self, user_id: Uuid) -> Result<u64>;
}
