//! Call session lifecycle
//!
//! `Created -> InProgress -> Completed`. `Created` is never stored: a session
//! row is only written once the provider has confirmed its room.
//!
//! Find-or-create on `unique_name` relies on the store's atomic
//! `insert_if_absent`. A request that loses the race joins the winner's
//! session instead of creating a second one.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::notification_queue::NotificationQueue;
use crate::domain::directory::{Directory, UserProfile};
use crate::domain::shared::{DomainError, Result, UniqueName};
use crate::domain::video_call::{
    AccessToken, CallSession, CallSessionRepository, CreateRoom, DispatchContext, InsertOutcome,
    MediaProviderClient, Notification, NotificationKind, ProviderError, ProviderRoom, RoomStatus,
    SessionStatus,
};

/// What a caller gets back when starting or joining a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub token: AccessToken,
    pub room: ProviderRoom,
    pub user: UserProfile,
    pub counterpart: Option<UserProfile>,
    /// False when the caller joined an existing session
    pub created: bool,
}

/// Outcome of `complete`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Completed,
    /// The provider had already ended the room
    AlreadyCompleted,
}

impl Ack {
    pub fn message(&self) -> &'static str {
        match self {
            Ack::Completed => "Room destroyed",
            Ack::AlreadyCompleted => "Room already destroyed",
        }
    }
}

pub struct CallSessionManager {
    sessions: Arc<dyn CallSessionRepository>,
    directory: Arc<dyn Directory>,
    provider: Arc<dyn MediaProviderClient>,
    notifications: NotificationQueue,
}

impl CallSessionManager {
    pub fn new(
        sessions: Arc<dyn CallSessionRepository>,
        directory: Arc<dyn Directory>,
        provider: Arc<dyn MediaProviderClient>,
        notifications: NotificationQueue,
    ) -> Self {
        Self {
            sessions,
            directory,
            provider,
            notifications,
        }
    }

    /// Join the session named `unique_name`, or start it with `contact_id`
    pub async fn start_or_join(
        &self,
        unique_name: &UniqueName,
        contact_id: Option<Uuid>,
        caller_id: Uuid,
    ) -> Result<SessionView> {
        if self
            .sessions
            .find_by_unique_name(unique_name.as_str())
            .await?
            .is_some()
        {
            return self.join(unique_name.as_str(), caller_id).await;
        }

        let contact_id = contact_id.ok_or(DomainError::ReceiverNotFound)?;
        self.initiate(contact_id, caller_id, Some(unique_name.clone()))
            .await
    }

    /// Start a new direct call to one of the caller's contacts
    ///
    /// This is the only path that creates a session. When `requested_name`
    /// is `None` a fresh name is generated.
    pub async fn initiate(
        &self,
        callee_contact_id: Uuid,
        caller_id: Uuid,
        requested_name: Option<UniqueName>,
    ) -> Result<SessionView> {
        let caller = self.load_caller(caller_id).await?;

        let contact = self
            .directory
            .find_contact(caller_id, callee_contact_id)
            .await?
            .ok_or(DomainError::ReceiverNotFound)?;
        let receiver = self
            .directory
            .find_user(contact.companion_id)
            .await?
            .ok_or(DomainError::ReceiverNotFound)?;

        // A direct call has two distinct parties
        if receiver.id == caller.id {
            return Err(DomainError::ReceiverNotFound);
        }

        if contact.blocked || self.directory.is_blocked(caller_id, receiver.id).await? {
            info!("Call from {} to {} rejected: blocked", caller_id, receiver.id);
            return Err(DomainError::ReceiverBlocked);
        }

        let unique_name = requested_name.unwrap_or_else(UniqueName::generate);
        let room = self.open_provider_room(&unique_name).await?;

        let session = CallSession::new(
            unique_name.clone(),
            room.room_type.clone(),
            caller.id,
            receiver.id,
        );

        let session = match self.sessions.insert_if_absent(&session).await? {
            InsertOutcome::Inserted(session) => session,
            InsertOutcome::Existing(existing) => {
                info!(
                    "Session {} was created concurrently, joining it",
                    existing.unique_name
                );
                return self.join(existing.unique_name.as_str(), caller_id).await;
            }
        };

        info!(
            "Session {} started: {} -> {}",
            session.unique_name, caller.id, receiver.id
        );

        let token = self
            .provider
            .issue_token(&caller.provider_identity(), &room.unique_name)
            .await?;

        self.notify(NotificationKind::IncomingCall, &caller, receiver.id, &session);

        Ok(SessionView {
            token,
            room,
            user: caller,
            counterpart: Some(receiver),
            created: true,
        })
    }

    /// Enter an existing session with a fresh token
    pub async fn join(&self, unique_name: &str, caller_id: Uuid) -> Result<SessionView> {
        let session = self.find_party_session(unique_name, caller_id).await?;
        let caller = self.load_caller(caller_id).await?;

        let room = self.provider.fetch_room(unique_name).await?;
        let token = self
            .provider
            .issue_token(&caller.provider_identity(), &room.unique_name)
            .await?;

        self.notify(NotificationKind::AcceptCall, &caller, session.receiver_id, &session);

        debug!("{} joined session {}", caller_id, unique_name);

        let counterpart = self
            .directory
            .find_user(session.counterpart_of(caller_id))
            .await?;
        Ok(SessionView {
            token,
            room,
            user: caller,
            counterpart,
            created: false,
        })
    }

    /// End a session, on the provider first and then locally
    pub async fn complete(&self, unique_name: &str, caller_id: Uuid) -> Result<Ack> {
        let session = self.find_party_session(unique_name, caller_id).await?;

        let room = match self.provider.fetch_room(unique_name).await {
            Ok(room) => room,
            // Ended rooms stop resolving by name
            Err(ProviderError::RoomNotFound(msg)) => {
                warn!("Provider has no room {}: {}", unique_name, msg);
                self.catch_up_completed(&session).await?;
                return Ok(Ack::AlreadyCompleted);
            }
            Err(e) => return Err(e.into()),
        };

        if room.status.is_ended() {
            self.catch_up_completed(&session).await?;
            return Ok(Ack::AlreadyCompleted);
        }

        self.provider
            .update_room_status(&room.sid, RoomStatus::Completed)
            .await?;
        self.sessions
            .update_status(session.id, SessionStatus::Completed)
            .await?;

        info!("Session {} completed by {}", unique_name, caller_id);

        let caller = self.load_caller(caller_id).await?;
        self.notify(NotificationKind::EndCall, &caller, session.receiver_id, &session);

        Ok(Ack::Completed)
    }

    async fn open_provider_room(&self, unique_name: &UniqueName) -> Result<ProviderRoom> {
        match self
            .provider
            .create_room(&CreateRoom::group(unique_name.as_str()))
            .await
        {
            Ok(room) => Ok(room),
            Err(ProviderError::RoomExists(msg)) => {
                // Left behind by a request that never stored its session,
                // or created by a concurrent request
                warn!("Adopting existing provider room {}: {}", unique_name, msg);
                Ok(self.provider.fetch_room(unique_name.as_str()).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn catch_up_completed(&self, session: &CallSession) -> Result<()> {
        if !session.is_completed() {
            self.sessions
                .update_status(session.id, SessionStatus::Completed)
                .await?;
        }
        Ok(())
    }

    async fn find_party_session(&self, unique_name: &str, caller_id: Uuid) -> Result<CallSession> {
        let session = self
            .sessions
            .find_by_unique_name(unique_name)
            .await?
            .ok_or(DomainError::SessionNotFound)?;

        if session.role_of(caller_id).is_none() {
            return Err(DomainError::SessionNotFound);
        }
        Ok(session)
    }

    async fn load_caller(&self, caller_id: Uuid) -> Result<UserProfile> {
        self.directory
            .find_user(caller_id)
            .await?
            .ok_or_else(|| DomainError::Unauthorized("Unknown user".to_string()))
    }

    fn notify(
        &self,
        kind: NotificationKind,
        sender: &UserProfile,
        recipient_id: Uuid,
        session: &CallSession,
    ) {
        let notification = Notification::for_call(kind, &sender.name, recipient_id, session.id);
        self.notifications.enqueue(
            notification,
            DispatchContext {
                room_name: session.unique_name.to_string(),
                sender: sender.clone(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::notification_queue::DispatchJob;
    use crate::domain::directory::Contact;
    use crate::domain::video_call::provider::MockMediaProviderClient;
    use crate::infrastructure::persistence::{InMemoryCallSessionRepository, InMemoryDirectory};
    use crate::infrastructure::provider::InMemoryMediaProvider;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        sessions: Arc<InMemoryCallSessionRepository>,
        directory: Arc<InMemoryDirectory>,
        alice: Uuid,
        bob: Uuid,
        /// Alice's contact entry for Bob
        alice_to_bob: Uuid,
        /// Bob's contact entry for Alice
        bob_to_alice: Uuid,
    }

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            profile_status: None,
            avatar_key: None,
            country: None,
        }
    }

    fn contact(owner: Uuid, companion: Uuid, name: &str) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            owner_id: owner,
            companion_id: companion,
            name: name.to_string(),
            avatar_key: None,
            blocked: false,
        }
    }

    async fn fixture() -> Fixture {
        let directory = Arc::new(InMemoryDirectory::new());
        let alice = profile("Alice");
        let bob = profile("Bob");
        let alice_to_bob = contact(alice.id, bob.id, "Bob");
        let bob_to_alice = contact(bob.id, alice.id, "Alice");

        let fx = Fixture {
            sessions: Arc::new(InMemoryCallSessionRepository::new()),
            directory: directory.clone(),
            alice: alice.id,
            bob: bob.id,
            alice_to_bob: alice_to_bob.id,
            bob_to_alice: bob_to_alice.id,
        };
        directory.add_user(alice).await;
        directory.add_user(bob).await;
        directory.add_contact(alice_to_bob).await;
        directory.add_contact(bob_to_alice).await;
        fx
    }

    fn manager(
        fx: &Fixture,
        provider: Arc<dyn MediaProviderClient>,
    ) -> (CallSessionManager, UnboundedReceiver<DispatchJob>) {
        let (queue, rx) = NotificationQueue::new();
        let manager =
            CallSessionManager::new(fx.sessions.clone(), fx.directory.clone(), provider, queue);
        (manager, rx)
    }

    fn name(s: &str) -> UniqueName {
        UniqueName::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_initiate_creates_session_and_notifies_receiver() {
        let fx = fixture().await;
        let (manager, mut rx) = manager(&fx, Arc::new(InMemoryMediaProvider::new()));

        let view = manager
            .initiate(fx.alice_to_bob, fx.alice, Some(name("alice-bob")))
            .await
            .unwrap();

        assert!(view.created);
        assert_eq!(view.token.identity, "alice@example.com");
        assert_eq!(view.room.unique_name, "alice-bob");
        assert_eq!(view.counterpart.map(|c| c.id), Some(fx.bob));

        let stored = fx.sessions.find_by_unique_name("alice-bob").await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::InProgress);
        assert_eq!(stored.mode, crate::domain::video_call::CallMode::DirectVideoCall);
        assert_eq!(stored.initiator_id, fx.alice);
        assert_eq!(stored.receiver_id, fx.bob);

        let job = rx.try_recv().unwrap();
        assert_eq!(job.notification.kind, NotificationKind::IncomingCall);
        assert_eq!(job.notification.user_id, fx.bob);
        assert_eq!(job.notification.room_id, Some(stored.id));
        assert_eq!(job.context.room_name, "alice-bob");
    }

    #[tokio::test]
    async fn test_complete_twice_is_idempotent() {
        let fx = fixture().await;
        let (manager, mut rx) = manager(&fx, Arc::new(InMemoryMediaProvider::new()));

        manager
            .initiate(fx.alice_to_bob, fx.alice, Some(name("alice-bob")))
            .await
            .unwrap();

        assert_eq!(
            manager.complete("alice-bob", fx.alice).await.unwrap(),
            Ack::Completed
        );
        assert_eq!(
            manager.complete("alice-bob", fx.bob).await.unwrap(),
            Ack::AlreadyCompleted
        );

        let stored = fx.sessions.find_by_unique_name("alice-bob").await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Completed);

        let kinds: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|job| (job.notification.kind, job.notification.user_id))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (NotificationKind::IncomingCall, fx.bob),
                (NotificationKind::EndCall, fx.bob),
            ]
        );
    }

    #[tokio::test]
    async fn test_complete_when_provider_lost_the_room() {
        let fx = fixture().await;
        let session = CallSession::new(name("alice-bob"), "group".to_string(), fx.alice, fx.bob);
        fx.sessions.insert_if_absent(&session).await.unwrap();

        let mut provider = MockMediaProviderClient::new();
        provider
            .expect_fetch_room()
            .returning(|_| Err(ProviderError::RoomNotFound("Room not found".to_string())));
        provider.expect_update_room_status().times(0);

        let (manager, mut rx) = manager(&fx, Arc::new(provider));
        assert_eq!(
            manager.complete("alice-bob", fx.alice).await.unwrap(),
            Ack::AlreadyCompleted
        );

        let stored = fx.sessions.find_by_id(session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Completed);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_blocked_receiver_is_rejected_without_side_effects() {
        let fx = fixture().await;
        fx.directory.set_blocked(fx.bob_to_alice, true).await;

        let mut provider = MockMediaProviderClient::new();
        provider.expect_create_room().times(0);

        let (manager, mut rx) = manager(&fx, Arc::new(provider));
        let err = manager
            .initiate(fx.alice_to_bob, fx.alice, None)
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::ReceiverBlocked);
        assert!(fx.sessions.is_empty().await);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_contact_is_receiver_not_found() {
        let fx = fixture().await;
        let (manager, _rx) = manager(&fx, Arc::new(MockMediaProviderClient::new()));

        let err = manager
            .initiate(Uuid::new_v4(), fx.alice, None)
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::ReceiverNotFound);

        // Bob's contact id is not in Alice's address book
        let err = manager
            .initiate(fx.bob_to_alice, fx.alice, None)
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::ReceiverNotFound);

        let err = manager
            .start_or_join(&name("nobody-here"), None, fx.alice)
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::ReceiverNotFound);
    }

    #[tokio::test]
    async fn test_provider_failure_keeps_message_and_stores_nothing() {
        let fx = fixture().await;
        let mut provider = MockMediaProviderClient::new();
        provider
            .expect_create_room()
            .returning(|_| Err(ProviderError::Unavailable("Connection timed out".to_string())));

        let (manager, _rx) = manager(&fx, Arc::new(provider));
        let err = manager
            .initiate(fx.alice_to_bob, fx.alice, None)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            DomainError::ProviderUnavailable("Connection timed out".to_string())
        );
        assert_eq!(err.to_string(), "Connection timed out");
        assert!(fx.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn test_join_and_complete_notify_the_receiver() {
        let fx = fixture().await;
        let (manager, mut rx) = manager(&fx, Arc::new(InMemoryMediaProvider::new()));

        manager
            .initiate(fx.alice_to_bob, fx.alice, Some(name("alice-bob")))
            .await
            .unwrap();
        let view = manager
            .start_or_join(&name("alice-bob"), None, fx.bob)
            .await
            .unwrap();

        assert!(!view.created);
        assert_eq!(view.token.identity, "bob@example.com");
        assert_eq!(view.counterpart.map(|c| c.id), Some(fx.alice));
        assert_eq!(fx.sessions.len().await, 1);

        manager.complete("alice-bob", fx.alice).await.unwrap();

        let kinds: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|job| (job.notification.kind, job.notification.user_id))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (NotificationKind::IncomingCall, fx.bob),
                (NotificationKind::AcceptCall, fx.bob),
                (NotificationKind::EndCall, fx.bob),
            ]
        );
    }

    #[tokio::test]
    async fn test_contact_pointing_at_self_is_receiver_not_found() {
        let fx = fixture().await;
        let to_self = contact(fx.alice, fx.alice, "Me");
        let to_self_id = to_self.id;
        fx.directory.add_contact(to_self).await;

        let mut provider = MockMediaProviderClient::new();
        provider.expect_create_room().times(0);

        let (manager, mut rx) = manager(&fx, Arc::new(provider));
        let err = manager
            .initiate(to_self_id, fx.alice, Some(name("alice-alice")))
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::ReceiverNotFound);
        assert!(fx.sessions.is_empty().await);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_outsider_cannot_join_or_complete() {
        let fx = fixture().await;
        let (manager, _rx) = manager(&fx, Arc::new(InMemoryMediaProvider::new()));
        manager
            .initiate(fx.alice_to_bob, fx.alice, Some(name("alice-bob")))
            .await
            .unwrap();

        let mallory = profile("Mallory");
        let mallory_id = mallory.id;
        fx.directory.add_user(mallory).await;

        assert_eq!(
            manager.join("alice-bob", mallory_id).await.unwrap_err(),
            DomainError::SessionNotFound
        );
        assert_eq!(
            manager.complete("alice-bob", mallory_id).await.unwrap_err(),
            DomainError::SessionNotFound
        );
        assert_eq!(
            manager.complete("missing", fx.alice).await.unwrap_err(),
            DomainError::SessionNotFound
        );
    }

    #[tokio::test]
    async fn test_concurrent_start_creates_one_session() {
        let fx = fixture().await;
        let (manager, _rx) = manager(&fx, Arc::new(InMemoryMediaProvider::new()));
        let room = name("alice-bob");

        let (from_alice, from_bob) = tokio::join!(
            manager.start_or_join(&room, Some(fx.alice_to_bob), fx.alice),
            manager.start_or_join(&room, Some(fx.bob_to_alice), fx.bob),
        );

        let from_alice = from_alice.unwrap();
        let from_bob = from_bob.unwrap();
        assert_eq!(fx.sessions.len().await, 1);
        assert_ne!(from_alice.created, from_bob.created);
        assert_eq!(from_alice.room.sid, from_bob.room.sid);
    }

    #[tokio::test]
    async fn test_orphaned_provider_room_is_adopted() {
        let fx = fixture().await;
        let provider = Arc::new(InMemoryMediaProvider::new());
        // Room created by a request that never stored its session
        let orphan = provider
            .create_room(&CreateRoom::group("alice-bob"))
            .await
            .unwrap();

        let (manager, _rx) = manager(&fx, provider);
        let view = manager
            .initiate(fx.alice_to_bob, fx.alice, Some(name("alice-bob")))
            .await
            .unwrap();

        assert!(view.created);
        assert_eq!(view.room.sid, orphan.sid);
        assert_eq!(fx.sessions.len().await, 1);
    }
}
