//! Unified call history
//!
//! Merges sessions the viewer placed, sessions they received and group calls
//! they took part in into one newest-first feed, and applies per-party soft
//! deletes. Read-only apart from the viewer's own hidden flags.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::domain::directory::Directory;
use crate::domain::shared::Result;
use crate::domain::video_call::{
    merge_streams, CallMode, CallSession, CallSessionRepository, ContactSummary,
    DirectCallSummary, GroupCallRepository, GroupCallSession, GroupCallSummary, HistoryEntry,
    HistoryEntrySummary, MemberSummary, ModeFilter,
};

/// Number of entries cleared by `hide_recent` over HTTP
pub const RECENT_CLEAR_LIMIT: usize = 10;

/// Outcome of a soft delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HideOutcome {
    Hidden(u64),
    /// Nothing visible matched; reported, not escalated
    NothingToDelete,
}

impl HideOutcome {
    fn from_count(count: u64) -> Self {
        if count == 0 {
            HideOutcome::NothingToDelete
        } else {
            HideOutcome::Hidden(count)
        }
    }
}

pub struct CallHistoryAggregator {
    sessions: Arc<dyn CallSessionRepository>,
    groups: Arc<dyn GroupCallRepository>,
    directory: Arc<dyn Directory>,
    media: MediaConfig,
}

impl CallHistoryAggregator {
    pub fn new(
        sessions: Arc<dyn CallSessionRepository>,
        groups: Arc<dyn GroupCallRepository>,
        directory: Arc<dyn Directory>,
        media: MediaConfig,
    ) -> Self {
        Self {
            sessions,
            groups,
            directory,
            media,
        }
    }

    /// Visible history for `user_id`, newest first
    ///
    /// `limit` applies to each of the three sources before the merge, so up
    /// to three times `limit` entries can come back.
    pub async fn fetch_history(
        &self,
        user_id: Uuid,
        filter: ModeFilter,
        limit: Option<i64>,
    ) -> Result<Vec<HistoryEntry>> {
        let direct_mode = filter.direct_mode();

        let initiated = self.sessions.list_initiated(user_id, direct_mode, limit);
        let received = self.sessions.list_received(user_id, direct_mode, limit);
        let group = async {
            match filter.group_stream() {
                Some(stream) => {
                    self.groups
                        .list_for_participant(user_id, stream.mode, limit)
                        .await
                }
                None => Ok(Vec::new()),
            }
        };

        let (initiated, received, group) = futures::try_join!(initiated, received, group)?;
        debug!(
            "History for {}: {} placed, {} received, {} group",
            user_id,
            initiated.len(),
            received.len(),
            group.len()
        );

        Ok(merge_streams(initiated, received, group))
    }

    /// The `n` most recent entries across all sources
    pub async fn fetch_recent(&self, user_id: Uuid, n: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries = self
            .fetch_history(user_id, ModeFilter::All, Some(n as i64))
            .await?;
        entries.truncate(n);
        Ok(entries)
    }

    /// Shaped history, ready for the API
    pub async fn summaries(
        &self,
        viewer_id: Uuid,
        entries: Vec<HistoryEntry>,
    ) -> Result<Vec<HistoryEntrySummary>> {
        try_join_all(entries.iter().map(|entry| self.shape(entry, viewer_id))).await
    }

    /// Shape one entry for `viewer_id`
    pub async fn shape(&self, entry: &HistoryEntry, viewer_id: Uuid) -> Result<HistoryEntrySummary> {
        match entry {
            HistoryEntry::Direct(session) => self.shape_direct(session, viewer_id).await,
            HistoryEntry::Group(group) => self.shape_group(group).await,
        }
    }

    async fn shape_direct(
        &self,
        session: &CallSession,
        viewer_id: Uuid,
    ) -> Result<HistoryEntrySummary> {
        let other_id = session.counterpart_of(viewer_id);
        let other = self.directory.find_user(other_id).await?;
        let contact = self.directory.find_contact_for(viewer_id, other_id).await?;

        let country = other.as_ref().and_then(|o| o.country.clone());
        let contacts = contact.map(|c| ContactSummary {
            contact_id: c.id,
            user_id: c.companion_id,
            image_url: self.media.avatar_url(c.avatar_key.as_deref()),
            blocked: c.blocked,
            name: c.name,
            country,
        });

        Ok(HistoryEntrySummary::Direct(DirectCallSummary {
            room_id: session.id,
            room_mode: session.mode,
            created_at: session.created_at,
            participant_name: other.as_ref().map(|o| o.name.clone()).unwrap_or_default(),
            profile_status: other
                .as_ref()
                .and_then(|o| o.profile_status.clone())
                .unwrap_or_default(),
            receiver_image: self
                .media
                .avatar_url(other.as_ref().and_then(|o| o.avatar_key.as_deref())),
            call_status: session.direction_for(viewer_id).as_str().to_string(),
            contacts,
        }))
    }

    async fn shape_group(&self, session: &GroupCallSession) -> Result<HistoryEntrySummary> {
        let group = self.directory.find_group(session.group_id).await?;
        let members = self.directory.group_contacts(session.group_id).await?;

        let receiver_image = members
            .iter()
            .take(2)
            .map(|m| self.media.avatar_url(m.avatar_key.as_deref()))
            .collect();
        let contacts = members
            .into_iter()
            .map(|m| MemberSummary {
                contact_id: m.id,
                image_url: self.media.avatar_url(m.avatar_key.as_deref()),
                blocked: m.blocked,
                name: m.name,
            })
            .collect();

        Ok(HistoryEntrySummary::Group(GroupCallSummary {
            room_id: session.id,
            room_mode: session.mode,
            created_at: session.created_at,
            group_id: session.group_id,
            profile_status: group
                .as_ref()
                .and_then(|g| g.status.clone())
                .unwrap_or_default(),
            participant_name: group.map(|g| g.name).unwrap_or_default(),
            receiver_image,
            contacts,
        }))
    }

    /// Hide a direct session from the viewer's feed only
    pub async fn hide(&self, session_id: Uuid, viewer_id: Uuid) -> Result<HideOutcome> {
        match self.sessions.find_by_id(session_id).await? {
            Some(session) => self.hide_session(&session, viewer_id).await,
            None => Ok(HideOutcome::NothingToDelete),
        }
    }

    /// Hide a direct video call session; other modes are left alone
    pub async fn hide_direct(&self, session_id: Uuid, viewer_id: Uuid) -> Result<HideOutcome> {
        match self.sessions.find_by_id(session_id).await? {
            Some(session) if session.mode == CallMode::DirectVideoCall => {
                self.hide_session(&session, viewer_id).await
            }
            _ => Ok(HideOutcome::NothingToDelete),
        }
    }

    /// Hide the viewer's participation in a group call
    pub async fn hide_group(&self, session_id: Uuid, viewer_id: Uuid) -> Result<HideOutcome> {
        let hidden = self.groups.hide_participation(session_id, viewer_id).await?;
        Ok(HideOutcome::from_count(hidden as u64))
    }

    /// Hide a session of either shape by id
    pub async fn hide_any(&self, session_id: Uuid, viewer_id: Uuid) -> Result<HideOutcome> {
        if let Some(session) = self.sessions.find_by_id(session_id).await? {
            return self.hide_session(&session, viewer_id).await;
        }
        if self.groups.find_by_id(session_id).await?.is_some() {
            return self.hide_group(session_id, viewer_id).await;
        }
        Ok(HideOutcome::NothingToDelete)
    }

    /// Hide everything currently visible to the viewer
    pub async fn hide_all(&self, viewer_id: Uuid) -> Result<HideOutcome> {
        let direct = self.sessions.hide_all_for_user(viewer_id).await?;
        let group = self.groups.hide_all_for_user(viewer_id).await?;

        info!(
            "Cleared call history for {}: {} direct, {} group",
            viewer_id, direct, group
        );
        Ok(HideOutcome::from_count(direct + group))
    }

    /// Hide the viewer's `limit` most recent entries
    pub async fn hide_recent(&self, viewer_id: Uuid, limit: usize) -> Result<HideOutcome> {
        let entries = self.fetch_recent(viewer_id, limit).await?;

        let mut hidden = 0;
        for entry in &entries {
            let outcome = match entry {
                HistoryEntry::Direct(session) => self.hide_session(session, viewer_id).await?,
                HistoryEntry::Group(group) => self.hide_group(group.id, viewer_id).await?,
            };
            if let HideOutcome::Hidden(n) = outcome {
                hidden += n;
            }
        }

        Ok(HideOutcome::from_count(hidden))
    }

    async fn hide_session(&self, session: &CallSession, viewer_id: Uuid) -> Result<HideOutcome> {
        let mut hidden = 0;
        if session.initiator_id == viewer_id
            && !session.hidden_by_initiator
            && self.sessions.hide_for_initiator(session.id).await?
        {
            hidden += 1;
        }
        if session.receiver_id == viewer_id
            && !session.hidden_by_receiver
            && self.sessions.hide_for_receiver(session.id).await?
        {
            hidden += 1;
        }
        Ok(HideOutcome::from_count(hidden))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::directory::{Contact, GroupProfile, UserProfile};
    use crate::domain::shared::UniqueName;
    use crate::infrastructure::persistence::{
        InMemoryCallSessionRepository, InMemoryDirectory, InMemoryGroupCallRepository,
    };
    use chrono::{Duration, Utc};

    struct Fixture {
        sessions: Arc<InMemoryCallSessionRepository>,
        groups: Arc<InMemoryGroupCallRepository>,
        directory: Arc<InMemoryDirectory>,
        aggregator: CallHistoryAggregator,
        alice: Uuid,
        bob: Uuid,
    }

    fn user(name: &str, avatar: Option<&str>) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: None,
            profile_status: Some(format!("{} is here", name)),
            avatar_key: avatar.map(str::to_string),
            country: Some("NZ".to_string()),
        }
    }

    async fn fixture() -> Fixture {
        let sessions = Arc::new(InMemoryCallSessionRepository::new());
        let groups = Arc::new(InMemoryGroupCallRepository::new());
        let directory = Arc::new(InMemoryDirectory::new());

        let alice = user("Alice", Some("alice.png"));
        let bob = user("Bob", Some("bob.png"));
        let (alice_id, bob_id) = (alice.id, bob.id);
        directory.add_user(alice).await;
        directory.add_user(bob).await;

        let aggregator = CallHistoryAggregator::new(
            sessions.clone(),
            groups.clone(),
            directory.clone(),
            MediaConfig {
                avatar_base_url: "https://cdn.example.com".to_string(),
            },
        );

        Fixture {
            sessions,
            groups,
            directory,
            aggregator,
            alice: alice_id,
            bob: bob_id,
        }
    }

    impl Fixture {
        async fn direct(&self, from: Uuid, to: Uuid, minutes_ago: i64) -> CallSession {
            let mut s = CallSession::new(UniqueName::generate(), "group".to_string(), from, to);
            s.created_at = Utc::now() - Duration::minutes(minutes_ago);
            self.sessions.insert_if_absent(&s).await.unwrap();
            s
        }

        async fn group(&self, members: &[Uuid], minutes_ago: i64) -> GroupCallSession {
            let mut g = GroupCallSession::new(Uuid::new_v4());
            g.created_at = Utc::now() - Duration::minutes(minutes_ago);
            self.groups.create(&g, members).await.unwrap();
            g
        }
    }

    fn ids(entries: &[HistoryEntry]) -> Vec<Uuid> {
        entries.iter().map(|e| e.id()).collect()
    }

    #[tokio::test]
    async fn test_history_merges_all_sources_newest_first() {
        let fx = fixture().await;
        let placed = fx.direct(fx.alice, fx.bob, 10).await;
        let received = fx.direct(fx.bob, fx.alice, 5).await;
        let group = fx.group(&[fx.alice, fx.bob], 1).await;

        let history = fx
            .aggregator
            .fetch_history(fx.alice, ModeFilter::All, None)
            .await
            .unwrap();
        assert_eq!(ids(&history), vec![group.id, received.id, placed.id]);

        let direct_only = fx
            .aggregator
            .fetch_history(fx.alice, ModeFilter::DirectOnly, None)
            .await
            .unwrap();
        assert_eq!(ids(&direct_only), vec![received.id, placed.id]);

        let video = fx
            .aggregator
            .fetch_history(fx.alice, ModeFilter::Video, None)
            .await
            .unwrap();
        assert_eq!(video.len(), 3);
    }

    #[tokio::test]
    async fn test_recent_is_true_recency_across_uneven_sources() {
        let fx = fixture().await;
        let mut placed = Vec::new();
        for minutes in 1..=5 {
            placed.push(fx.direct(fx.alice, fx.bob, minutes).await);
        }
        fx.direct(fx.bob, fx.alice, 30).await;
        fx.group(&[fx.alice], 60).await;

        let recent = fx.aggregator.fetch_recent(fx.alice, 3).await.unwrap();
        assert_eq!(
            ids(&recent),
            placed.iter().take(3).map(|s| s.id).collect::<Vec<_>>()
        );

        // Limit applies per source before the merge
        let limited = fx
            .aggregator
            .fetch_history(fx.alice, ModeFilter::All, Some(3))
            .await
            .unwrap();
        assert_eq!(limited.len(), 5);
    }

    #[tokio::test]
    async fn test_hiding_is_per_party() {
        let fx = fixture().await;
        let s = fx.direct(fx.alice, fx.bob, 1).await;

        assert_eq!(
            fx.aggregator.hide(s.id, fx.alice).await.unwrap(),
            HideOutcome::Hidden(1)
        );
        assert_eq!(
            fx.aggregator.hide(s.id, fx.alice).await.unwrap(),
            HideOutcome::NothingToDelete
        );

        let stored = fx.sessions.find_by_id(s.id).await.unwrap().unwrap();
        assert!(stored.hidden_by_initiator);
        assert!(!stored.hidden_by_receiver);

        let alice_view = fx
            .aggregator
            .fetch_history(fx.alice, ModeFilter::All, None)
            .await
            .unwrap();
        let bob_view = fx
            .aggregator
            .fetch_history(fx.bob, ModeFilter::All, None)
            .await
            .unwrap();
        assert!(alice_view.is_empty());
        assert_eq!(ids(&bob_view), vec![s.id]);

        let outsider = Uuid::new_v4();
        assert_eq!(
            fx.aggregator.hide(s.id, outsider).await.unwrap(),
            HideOutcome::NothingToDelete
        );
    }

    #[tokio::test]
    async fn test_hide_all_empties_feed() {
        let fx = fixture().await;
        fx.direct(fx.alice, fx.bob, 3).await;
        fx.direct(fx.bob, fx.alice, 2).await;
        fx.group(&[fx.alice, fx.bob], 1).await;

        assert_eq!(
            fx.aggregator.hide_all(fx.alice).await.unwrap(),
            HideOutcome::Hidden(3)
        );
        assert!(fx
            .aggregator
            .fetch_history(fx.alice, ModeFilter::All, None)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            fx.aggregator.hide_all(fx.alice).await.unwrap(),
            HideOutcome::NothingToDelete
        );

        let bob_view = fx
            .aggregator
            .fetch_history(fx.bob, ModeFilter::All, None)
            .await
            .unwrap();
        assert_eq!(bob_view.len(), 3);
    }

    #[tokio::test]
    async fn test_row_with_one_user_in_both_roles_is_fully_hidden() {
        let fx = fixture().await;
        let s = fx.direct(fx.alice, fx.alice, 1).await;

        assert_eq!(
            fx.aggregator.hide(s.id, fx.alice).await.unwrap(),
            HideOutcome::Hidden(2)
        );
        assert!(fx
            .aggregator
            .fetch_history(fx.alice, ModeFilter::All, None)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            fx.aggregator.hide_all(fx.alice).await.unwrap(),
            HideOutcome::NothingToDelete
        );
    }

    #[tokio::test]
    async fn test_hide_recent_leaves_older_entries() {
        let fx = fixture().await;
        for minutes in 1..=12 {
            fx.direct(fx.alice, fx.bob, minutes).await;
        }

        assert_eq!(
            fx.aggregator
                .hide_recent(fx.alice, RECENT_CLEAR_LIMIT)
                .await
                .unwrap(),
            HideOutcome::Hidden(10)
        );
        let left = fx
            .aggregator
            .fetch_history(fx.alice, ModeFilter::All, None)
            .await
            .unwrap();
        assert_eq!(left.len(), 2);
    }

    #[tokio::test]
    async fn test_typed_and_untyped_single_hides() {
        let fx = fixture().await;
        let g = fx.group(&[fx.alice, fx.bob], 1).await;

        assert_eq!(
            fx.aggregator.hide_direct(g.id, fx.alice).await.unwrap(),
            HideOutcome::NothingToDelete
        );
        assert_eq!(
            fx.aggregator.hide_any(g.id, fx.alice).await.unwrap(),
            HideOutcome::Hidden(1)
        );
        assert_eq!(
            fx.aggregator.hide_any(Uuid::new_v4(), fx.alice).await.unwrap(),
            HideOutcome::NothingToDelete
        );

        let s = fx.direct(fx.bob, fx.alice, 2).await;
        assert_eq!(
            fx.aggregator.hide_direct(s.id, fx.alice).await.unwrap(),
            HideOutcome::Hidden(1)
        );
        let stored = fx.sessions.find_by_id(s.id).await.unwrap().unwrap();
        assert!(stored.hidden_by_receiver);
        assert!(!stored.hidden_by_initiator);
    }

    #[tokio::test]
    async fn test_direct_summary_is_shaped_for_viewer() {
        let fx = fixture().await;
        let saved = Contact {
            id: Uuid::new_v4(),
            owner_id: fx.alice,
            companion_id: fx.bob,
            name: "Bobby".to_string(),
            avatar_key: None,
            blocked: false,
        };
        let saved_id = saved.id;
        fx.directory.add_contact(saved).await;
        let s = fx.direct(fx.alice, fx.bob, 1).await;

        let entry = HistoryEntry::Direct(s.clone());
        let HistoryEntrySummary::Direct(for_alice) =
            fx.aggregator.shape(&entry, fx.alice).await.unwrap()
        else {
            panic!("expected a direct summary");
        };
        assert_eq!(for_alice.participant_name, "Bob");
        assert_eq!(for_alice.call_status, "Outgoing");
        assert_eq!(for_alice.receiver_image, "https://cdn.example.com/bob.png");
        let contact = for_alice.contacts.unwrap();
        assert_eq!(contact.contact_id, saved_id);
        assert_eq!(contact.name, "Bobby");
        assert_eq!(contact.image_url, "");
        assert_eq!(contact.country.as_deref(), Some("NZ"));

        let HistoryEntrySummary::Direct(for_bob) =
            fx.aggregator.shape(&entry, fx.bob).await.unwrap()
        else {
            panic!("expected a direct summary");
        };
        assert_eq!(for_bob.participant_name, "Alice");
        assert_eq!(for_bob.call_status, "Incoming");
        assert!(for_bob.contacts.is_none());
    }

    #[tokio::test]
    async fn test_missing_profile_shapes_to_empty_strings() {
        let fx = fixture().await;
        let ghost = Uuid::new_v4();
        let s = fx.direct(fx.alice, ghost, 1).await;

        let summaries = fx
            .aggregator
            .summaries(fx.alice, vec![HistoryEntry::Direct(s)])
            .await
            .unwrap();
        let HistoryEntrySummary::Direct(summary) = &summaries[0] else {
            panic!("expected a direct summary");
        };
        assert_eq!(summary.participant_name, "");
        assert_eq!(summary.profile_status, "");
        assert_eq!(summary.receiver_image, "");
    }

    #[tokio::test]
    async fn test_group_summary_previews_two_avatars() {
        let fx = fixture().await;
        let group = GroupProfile {
            id: Uuid::new_v4(),
            name: "Climbing".to_string(),
            status: Some("Weekend trip".to_string()),
        };
        let members: Vec<Contact> = ["a.png", "b.png", "c.png"]
            .iter()
            .enumerate()
            .map(|(i, avatar)| Contact {
                id: Uuid::new_v4(),
                owner_id: fx.alice,
                companion_id: Uuid::new_v4(),
                name: format!("Member {}", i),
                avatar_key: Some(avatar.to_string()),
                blocked: i == 2,
            })
            .collect();
        let member_ids = members.iter().map(|c| c.id).collect();
        for m in members {
            fx.directory.add_contact(m).await;
        }
        fx.directory.add_group(group.clone(), member_ids).await;

        let mut session = GroupCallSession::new(group.id);
        session.created_at = Utc::now();
        fx.groups.create(&session, &[fx.alice]).await.unwrap();

        let HistoryEntrySummary::Group(summary) = fx
            .aggregator
            .shape(&HistoryEntry::Group(session), fx.alice)
            .await
            .unwrap()
        else {
            panic!("expected a group summary");
        };
        assert_eq!(summary.participant_name, "Climbing");
        assert_eq!(summary.profile_status, "Weekend trip");
        assert_eq!(
            summary.receiver_image,
            vec![
                "https://cdn.example.com/a.png".to_string(),
                "https://cdn.example.com/b.png".to_string()
            ]
        );
        assert_eq!(summary.contacts.len(), 3);
        assert!(summary.contacts[2].blocked);
    }
}
