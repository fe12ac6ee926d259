//! In-memory adapters
//!
//! Used by the `memory` feature and by tests. Every operation takes a single
//! lock, so find-or-create is atomic just like the unique index in Postgres.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::directory::{Contact, Directory, GroupProfile, UserProfile};
use crate::domain::shared::Result;
use crate::domain::video_call::{
    CallMode, CallSession, CallSessionRepository, GroupCallRepository, GroupCallSession,
    InsertOutcome, Notification, NotificationRepository, Participation, PartyRole, SessionStatus,
};

fn newest_first_limited<T, F>(mut items: Vec<T>, created_at: F, limit: Option<i64>) -> Vec<T>
where
    F: Fn(&T) -> chrono::DateTime<chrono::Utc>,
{
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    if let Some(limit) = limit {
        items.truncate(limit.max(0) as usize);
    }
    items
}

#[derive(Default)]
pub struct InMemoryCallSessionRepository {
    sessions: RwLock<HashMap<Uuid, CallSession>>,
}

impl InMemoryCallSessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, hidden or not
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn list_where<P>(&self, pred: P, mode: Option<CallMode>, limit: Option<i64>) -> Vec<CallSession>
    where
        P: Fn(&CallSession) -> bool,
    {
        let sessions = self.sessions.read().await;
        let matching = sessions
            .values()
            .filter(|s| pred(s) && mode.map_or(true, |m| s.mode == m))
            .cloned()
            .collect();
        newest_first_limited(matching, |s| s.created_at, limit)
    }
}

#[async_trait]
impl CallSessionRepository for InMemoryCallSessionRepository {
    async fn insert_if_absent(&self, session: &CallSession) -> Result<InsertOutcome> {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions
            .values()
            .find(|s| s.unique_name == session.unique_name)
        {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        sessions.insert(session.id, session.clone());
        Ok(InsertOutcome::Inserted(session.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CallSession>> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn find_by_unique_name(&self, unique_name: &str) -> Result<Option<CallSession>> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .find(|s| s.unique_name.as_str() == unique_name)
            .cloned())
    }

    async fn update_status(&self, id: Uuid, status: SessionStatus) -> Result<()> {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            if status == SessionStatus::Completed {
                session.mark_completed();
            } else {
                session.status = status;
            }
        }
        Ok(())
    }

    async fn list_initiated(
        &self,
        user_id: Uuid,
        mode: Option<CallMode>,
        limit: Option<i64>,
    ) -> Result<Vec<CallSession>> {
        Ok(self
            .list_where(
                |s| s.initiator_id == user_id && !s.hidden_by_initiator,
                mode,
                limit,
            )
            .await)
    }

    async fn list_received(
        &self,
        user_id: Uuid,
        mode: Option<CallMode>,
        limit: Option<i64>,
    ) -> Result<Vec<CallSession>> {
        Ok(self
            .list_where(
                |s| s.receiver_id == user_id && !s.hidden_by_receiver,
                mode,
                limit,
            )
            .await)
    }

    async fn hide_for_initiator(&self, id: Uuid) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(s) if !s.hidden_by_initiator => {
                s.hide_for(PartyRole::Initiator);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn hide_for_receiver(&self, id: Uuid) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(s) if !s.hidden_by_receiver => {
                s.hide_for(PartyRole::Receiver);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn hide_all_for_user(&self, user_id: Uuid) -> Result<u64> {
        let mut sessions = self.sessions.write().await;
        let mut hidden = 0;
        for s in sessions.values_mut() {
            if s.initiator_id == user_id && !s.hidden_by_initiator {
                s.hide_for(PartyRole::Initiator);
                hidden += 1;
            }
            if s.receiver_id == user_id && !s.hidden_by_receiver {
                s.hide_for(PartyRole::Receiver);
                hidden += 1;
            }
        }
        Ok(hidden)
    }
}

#[derive(Default)]
pub struct InMemoryGroupCallRepository {
    sessions: RwLock<HashMap<Uuid, GroupCallSession>>,
    participations: RwLock<Vec<Participation>>,
}

impl InMemoryGroupCallRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroupCallRepository for InMemoryGroupCallRepository {
    async fn create(&self, session: &GroupCallSession, member_ids: &[Uuid]) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let mut participations = self.participations.write().await;
        sessions.insert(session.id, session.clone());
        participations.extend(
            member_ids
                .iter()
                .map(|user_id| Participation::new(session.id, *user_id)),
        );
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupCallSession>> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn list_for_participant(
        &self,
        user_id: Uuid,
        mode: Option<CallMode>,
        limit: Option<i64>,
    ) -> Result<Vec<GroupCallSession>> {
        let sessions = self.sessions.read().await;
        let participations = self.participations.read().await;

        let matching = participations
            .iter()
            .filter(|p| p.user_id == user_id && !p.hidden)
            .filter_map(|p| sessions.get(&p.group_room_id))
            .filter(|s| mode.map_or(true, |m| s.mode == m))
            .cloned()
            .collect();
        Ok(newest_first_limited(matching, |s| s.created_at, limit))
    }

    async fn hide_participation(&self, group_room_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut participations = self.participations.write().await;
        match participations
            .iter_mut()
            .find(|p| p.group_room_id == group_room_id && p.user_id == user_id)
        {
            Some(p) if !p.hidden => {
                p.hidden = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn hide_all_for_user(&self, user_id: Uuid) -> Result<u64> {
        let mut participations = self.participations.write().await;
        let mut hidden = 0;
        for p in participations
            .iter_mut()
            .filter(|p| p.user_id == user_id && !p.hidden)
        {
            p.hidden = true;
            hidden += 1;
        }
        Ok(hidden)
    }
}

/// Directory seeded by hand
#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<Uuid, UserProfile>>,
    contacts: RwLock<Vec<Contact>>,
    groups: RwLock<HashMap<Uuid, GroupProfile>>,
    group_contacts: RwLock<HashMap<Uuid, Vec<Uuid>>>,
    devices: RwLock<HashMap<Uuid, Vec<String>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: UserProfile) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn add_contact(&self, contact: Contact) {
        self.contacts.write().await.push(contact);
    }

    pub async fn set_blocked(&self, contact_id: Uuid, blocked: bool) {
        if let Some(c) = self
            .contacts
            .write()
            .await
            .iter_mut()
            .find(|c| c.id == contact_id)
        {
            c.blocked = blocked;
        }
    }

    pub async fn add_group(&self, group: GroupProfile, contact_ids: Vec<Uuid>) {
        self.group_contacts.write().await.insert(group.id, contact_ids);
        self.groups.write().await.insert(group.id, group);
    }

    pub async fn add_device(&self, user_id: Uuid, token: impl Into<String>) {
        self.devices
            .write()
            .await
            .entry(user_id)
            .or_default()
            .push(token.into());
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn find_contact(&self, owner_id: Uuid, contact_id: Uuid) -> Result<Option<Contact>> {
        Ok(self
            .contacts
            .read()
            .await
            .iter()
            .find(|c| c.owner_id == owner_id && c.id == contact_id)
            .cloned())
    }

    async fn find_contact_for(
        &self,
        owner_id: Uuid,
        companion_id: Uuid,
    ) -> Result<Option<Contact>> {
        Ok(self
            .contacts
            .read()
            .await
            .iter()
            .find(|c| c.owner_id == owner_id && c.companion_id == companion_id)
            .cloned())
    }

    async fn find_group(&self, group_id: Uuid) -> Result<Option<GroupProfile>> {
        Ok(self.groups.read().await.get(&group_id).cloned())
    }

    async fn group_contacts(&self, group_id: Uuid) -> Result<Vec<Contact>> {
        let ids = self
            .group_contacts
            .read()
            .await
            .get(&group_id)
            .cloned()
            .unwrap_or_default();
        let contacts = self.contacts.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| contacts.iter().find(|c| c.id == *id).cloned())
            .collect())
    }

    async fn device_tokens(&self, user_id: Uuid) -> Result<Vec<String>> {
        Ok(self
            .devices
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    notifications: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<()> {
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<Notification>> {
        let matching = self
            .notifications
            .read()
            .await
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first_limited(
            matching,
            |n| n.notification_date,
            Some(limit),
        ))
    }
}
