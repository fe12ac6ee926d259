//! Shared value objects

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::error::DomainError;

const MAX_UNIQUE_NAME_LEN: usize = 128;

/// Provider-visible room name, the join key between a local session and a provider room
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniqueName(String);

impl UniqueName {
    pub fn parse(name: &str) -> Result<Self, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("Room name must not be empty".to_string()));
        }
        if name.len() > MAX_UNIQUE_NAME_LEN {
            return Err(DomainError::Validation(format!(
                "Room name must be at most {} characters",
                MAX_UNIQUE_NAME_LEN
            )));
        }
        if name.contains('/') || name.chars().any(char::is_control) {
            return Err(DomainError::Validation(
                "Room name contains invalid characters".to_string(),
            ));
        }
        Ok(Self(name.to_string()))
    }

    /// Fresh name for a session the client did not name itself
    pub fn generate() -> Self {
        Self(format!("room-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniqueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
