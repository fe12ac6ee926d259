use callhub::application::{CallHistoryAggregator, CallSessionManager, NotificationQueue};
use callhub::config::Config;
use callhub::domain::directory::Directory;
use callhub::domain::video_call::{
    CallSessionRepository, GroupCallRepository, MediaProviderClient, NotificationDispatcher,
    NotificationRepository,
};
use callhub::infrastructure::notification::{FcmDispatcher, LoggingDispatcher};
use callhub::infrastructure::provider::{InMemoryMediaProvider, TwilioVideoClient};
use callhub::interface::api::{build_router, init_metrics, AppState, AuthKeys};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "postgres")]
use callhub::infrastructure::persistence::{
    create_pool, run_migrations, PgCallSessionRepository, PgDirectory,
    PgGroupCallRepository, PgNotificationRepository,
};
#[cfg(not(feature = "postgres"))]
use callhub::infrastructure::persistence::{
    InMemoryCallSessionRepository, InMemoryDirectory, InMemoryGroupCallRepository,
    InMemoryNotificationRepository,
};

struct Stores {
    sessions: Arc<dyn CallSessionRepository>,
    groups: Arc<dyn GroupCallRepository>,
    directory: Arc<dyn Directory>,
    notifications: Arc<dyn NotificationRepository>,
}

#[cfg(feature = "postgres")]
async fn open_stores(config: &Config) -> anyhow::Result<Stores> {
    info!("Initializing database connection...");
    let pool = create_pool(&config.database).await?;
    run_migrations(&pool).await?;
    info!("Database migrations completed");

    Ok(Stores {
        sessions: Arc::new(PgCallSessionRepository::new(pool.clone())),
        groups: Arc::new(PgGroupCallRepository::new(pool.clone())),
        directory: Arc::new(PgDirectory::new(pool.clone())),
        notifications: Arc::new(PgNotificationRepository::new(pool)),
    })
}

#[cfg(not(feature = "postgres"))]
async fn open_stores(_config: &Config) -> anyhow::Result<Stores> {
    warn!("Built without postgres, using in-memory stores");
    Ok(Stores {
        sessions: Arc::new(InMemoryCallSessionRepository::new()),
        groups: Arc::new(InMemoryGroupCallRepository::new()),
        directory: Arc::new(InMemoryDirectory::new()),
        notifications: Arc::new(InMemoryNotificationRepository::new()),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting callhub");

    let config = Config::load()?;
    info!("Configuration loaded: {:?}", config);

    let prometheus_handle = init_metrics()?;
    let stores = open_stores(&config).await?;

    let provider: Arc<dyn MediaProviderClient> = if config.provider.account_sid.is_empty() {
        warn!("No provider account configured, rooms are kept in memory");
        Arc::new(InMemoryMediaProvider::new())
    } else {
        Arc::new(TwilioVideoClient::new(&config.provider)?)
    };

    let dispatcher: Arc<dyn NotificationDispatcher> =
        if config.notifications.fcm_server_key.is_empty() {
            info!("No FCM key configured, notifications are only logged");
            Arc::new(LoggingDispatcher)
        } else {
            Arc::new(FcmDispatcher::new(
                &config.notifications,
                config.media.clone(),
                stores.directory.clone(),
            )?)
        };

    let (queue, rx) = NotificationQueue::new();
    let worker = NotificationQueue::spawn_worker(rx, dispatcher, Some(stores.notifications));

    let sessions = Arc::new(CallSessionManager::new(
        stores.sessions.clone(),
        stores.directory.clone(),
        provider,
        queue,
    ));
    let history = Arc::new(CallHistoryAggregator::new(
        stores.sessions,
        stores.groups,
        stores.directory,
        config.media.clone(),
    ));

    let state = AppState {
        sessions,
        history,
        auth: AuthKeys::from_secret(&config.auth.jwt_secret),
    };
    let app = build_router(state, prometheus_handle);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down...");
        })
        .await?;

    // Router state owned the last queue sender; the worker drains and exits
    if let Err(e) = worker.await {
        warn!("Notification worker ended abnormally: {}", e);
    }

    info!("callhub stopped");
    Ok(())
}
