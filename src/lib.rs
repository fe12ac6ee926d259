//! callhub - video call sessions and unified call history
//!
//! Drives one-to-one video calls against an external media provider and
//! serves a per-user call log that merges direct and group calls. Each party
//! can hide entries from their own log without affecting anyone else's.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::DomainError;
pub use domain::shared::result::Result;
