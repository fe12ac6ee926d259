//! Persistence implementations

pub mod memory;
#[cfg(feature = "postgres")]
pub mod call_session_repository;
#[cfg(feature = "postgres")]
pub mod database;
#[cfg(feature = "postgres")]
pub mod directory_repository;
#[cfg(feature = "postgres")]
pub mod group_call_repository;
#[cfg(feature = "postgres")]
pub mod notification_repository;

pub use memory::{
    InMemoryCallSessionRepository, InMemoryDirectory, InMemoryGroupCallRepository,
    InMemoryNotificationRepository,
};

#[cfg(feature = "postgres")]
pub use call_session_repository::PgCallSessionRepository;
#[cfg(feature = "postgres")]
pub use database::{create_pool, run_migrations};
#[cfg(feature = "postgres")]
pub use directory_repository::PgDirectory;
#[cfg(feature = "postgres")]
pub use group_call_repository::PgGroupCallRepository;
#[cfg(feature = "postgres")]
pub use notification_repository::PgNotificationRepository;
