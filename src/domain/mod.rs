//! Domain layer - Core business logic and rules
//!
//! This layer contains:
//! - Entities: call sessions, group calls, participations, notifications
//! - Value Objects: room names, call modes, statuses
//! - Repository Interfaces: Ports for persistence
//! - Collaborator Interfaces: media provider, push dispatcher, directory

pub mod directory;
pub mod shared;
pub mod video_call;

// Re-export commonly used types
pub use shared::{DomainError, Result};
