//! Firebase Cloud Messaging push delivery

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{MediaConfig, NotificationConfig};
use crate::domain::directory::Directory;
use crate::domain::video_call::{
    DispatchContext, DispatchError, Notification, NotificationDispatcher,
};

#[derive(Debug, Serialize, PartialEq)]
struct PushData {
    message: String,
    #[serde(rename = "type")]
    kind: String,
    room_name: String,
    sender_identity: String,
    sender_name: String,
    sender_image: String,
    receiver_identity: String,
    receiver_image: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct PushNotification {
    title: String,
    body: String,
    sound: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct PushMessage<'a> {
    to: &'a str,
    priority: &'static str,
    data: &'a PushData,
    notification: &'a PushNotification,
}

/// Sends one push per registered device of the recipient
pub struct FcmDispatcher {
    client: Client,
    endpoint: String,
    server_key: String,
    directory: Arc<dyn Directory>,
    media: MediaConfig,
}

impl FcmDispatcher {
    pub fn new(
        config: &NotificationConfig,
        media: MediaConfig,
        directory: Arc<dyn Directory>,
    ) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.fcm_endpoint.clone(),
            server_key: config.fcm_server_key.clone(),
            directory,
            media,
        })
    }

    async fn build_payload(
        &self,
        notification: &Notification,
        context: &DispatchContext,
    ) -> Result<(PushData, PushNotification), DispatchError> {
        let receiver = self
            .directory
            .find_user(notification.user_id)
            .await
            .map_err(|e| DispatchError::Lookup(e.to_string()))?;

        let (receiver_identity, receiver_image) = match receiver {
            Some(r) => (
                r.provider_identity(),
                self.media.avatar_url(r.avatar_key.as_deref()),
            ),
            None => (notification.user_id.to_string(), String::new()),
        };

        let data = PushData {
            message: notification.description.clone(),
            kind: notification.kind.as_str().to_string(),
            room_name: context.room_name.clone(),
            sender_identity: context.sender.provider_identity(),
            sender_name: context.sender.name.clone(),
            sender_image: self.media.avatar_url(context.sender.avatar_key.as_deref()),
            receiver_identity,
            receiver_image,
        };
        let push = PushNotification {
            title: notification.title.clone(),
            body: notification.description.clone(),
            sound: "default".to_string(),
        };
        Ok((data, push))
    }
}

#[async_trait]
impl NotificationDispatcher for FcmDispatcher {
    async fn dispatch(
        &self,
        notification: &Notification,
        context: &DispatchContext,
    ) -> Result<(), DispatchError> {
        let tokens = self
            .directory
            .device_tokens(notification.user_id)
            .await
            .map_err(|e| DispatchError::Lookup(e.to_string()))?;

        if tokens.is_empty() {
            debug!("No devices registered for {}", notification.user_id);
            return Ok(());
        }

        let (data, push) = self.build_payload(notification, context).await?;

        let mut failures = 0;
        for token in &tokens {
            let message = PushMessage {
                to: token,
                priority: "high",
                data: &data,
                notification: &push,
            };

            let result = self
                .client
                .post(&self.endpoint)
                .header("Authorization", format!("key={}", self.server_key))
                .json(&message)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    warn!("FCM rejected push: {}", response.status());
                    failures += 1;
                }
                Err(e) => {
                    warn!("FCM request failed: {}", e);
                    failures += 1;
                }
            }
        }

        if failures == tokens.len() {
            return Err(DispatchError::Transport(format!(
                "All {} pushes failed",
                failures
            )));
        }
        Ok(())
    }
}

/// Logs notifications instead of pushing them
#[derive(Debug, Default, Clone)]
pub struct LoggingDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn dispatch(
        &self,
        notification: &Notification,
        context: &DispatchContext,
    ) -> Result<(), DispatchError> {
        info!(
            "[{}] {} -> {} ({}): {}",
            notification.kind.as_str(),
            context.sender.name,
            notification.user_id,
            context.room_name,
            notification.description
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::directory::UserProfile;
    use crate::domain::video_call::NotificationKind;
    use crate::infrastructure::persistence::InMemoryDirectory;
    use uuid::Uuid;

    fn user(name: &str, email: &str, avatar: Option<&str>) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: Some(email.to_string()),
            profile_status: None,
            avatar_key: avatar.map(str::to_string),
            country: None,
        }
    }

    fn dispatcher(directory: Arc<InMemoryDirectory>) -> FcmDispatcher {
        let config = crate::config::Config::default();
        FcmDispatcher::new(
            &config.notifications,
            MediaConfig {
                avatar_base_url: "https://cdn.example.com".to_string(),
            },
            directory,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_payload_includes_both_parties() {
        let directory = Arc::new(InMemoryDirectory::new());
        let alice = user("Alice", "alice@example.com", Some("a.png"));
        let bob = user("Bob", "bob@example.com", None);
        directory.add_user(bob.clone()).await;

        let notification =
            Notification::for_call(NotificationKind::IncomingCall, "Alice", bob.id, Uuid::new_v4());
        let context = DispatchContext {
            room_name: "alice-bob".to_string(),
            sender: alice,
        };

        let (data, push) = dispatcher(directory)
            .build_payload(&notification, &context)
            .await
            .unwrap();

        assert_eq!(data.kind, "Video Call");
        assert_eq!(data.message, "Alice is calling.");
        assert_eq!(data.sender_identity, "alice@example.com");
        assert_eq!(data.sender_image, "https://cdn.example.com/a.png");
        assert_eq!(data.receiver_identity, "bob@example.com");
        assert_eq!(data.receiver_image, "");
        assert_eq!(push.title, "Calling");
        assert_eq!(push.sound, "default");
    }

    #[tokio::test]
    async fn test_no_devices_is_not_an_error() {
        let directory = Arc::new(InMemoryDirectory::new());
        let alice = user("Alice", "alice@example.com", None);
        let notification = Notification::for_call(
            NotificationKind::EndCall,
            "Alice",
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        let context = DispatchContext {
            room_name: "alice-bob".to_string(),
            sender: alice,
        };

        assert!(dispatcher(directory)
            .dispatch(&notification, &context)
            .await
            .is_ok());
    }
}
