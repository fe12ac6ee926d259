//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - Repository implementations (Postgres and in-memory)
//! - The media provider client
//! - Push notification dispatchers

pub mod notification;
pub mod persistence;
pub mod provider;
