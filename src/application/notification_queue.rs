//! Fire-and-forget notification delivery
//!
//! Session operations enqueue after their state change is stored and never
//! wait on delivery. A single worker persists each notification and hands it
//! to the dispatcher; failures are logged and dropped.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::video_call::{
    DispatchContext, Notification, NotificationDispatcher, NotificationRepository,
};

/// One queued delivery
#[derive(Debug, Clone)]
pub struct DispatchJob {
    pub notification: Notification,
    pub context: DispatchContext,
}

/// Sending half of the notification channel
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::UnboundedSender<DispatchJob>,
}

impl NotificationQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DispatchJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a notification; never fails the caller
    pub fn enqueue(&self, notification: Notification, context: DispatchContext) {
        let kind = notification.kind;
        let user_id = notification.user_id;
        if self
            .tx
            .send(DispatchJob {
                notification,
                context,
            })
            .is_err()
        {
            warn!(
                "Notification worker is gone, dropping {} notification for {}",
                kind.as_str(),
                user_id
            );
        }
    }

    /// Start the delivery worker
    pub fn spawn_worker(
        rx: mpsc::UnboundedReceiver<DispatchJob>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        repository: Option<Arc<dyn NotificationRepository>>,
    ) -> JoinHandle<()> {
        tokio::spawn(run_worker(rx, dispatcher, repository))
    }
}

/// Drain the channel until every sender is dropped
pub async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<DispatchJob>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    repository: Option<Arc<dyn NotificationRepository>>,
) {
    info!("Notification worker started");

    while let Some(job) = rx.recv().await {
        deliver(&job, dispatcher.as_ref(), repository.as_deref()).await;
    }

    info!("Notification worker stopped");
}

async fn deliver(
    job: &DispatchJob,
    dispatcher: &dyn NotificationDispatcher,
    repository: Option<&dyn NotificationRepository>,
) {
    if let Some(repo) = repository {
        if let Err(e) = repo.create(&job.notification).await {
            warn!("Failed to store notification {}: {}", job.notification.id, e);
        }
    }

    match dispatcher.dispatch(&job.notification, &job.context).await {
        Ok(()) => {
            debug!(
                "Dispatched {} notification to {}",
                job.notification.kind.as_str(),
                job.notification.user_id
            );
            counter!("notifications_dispatched_total", "outcome" => "sent").increment(1);
        }
        Err(e) => {
            warn!(
                "Failed to dispatch notification {}: {}",
                job.notification.id, e
            );
            counter!("notifications_dispatched_total", "outcome" => "failed").increment(1);
        }
    }
}
