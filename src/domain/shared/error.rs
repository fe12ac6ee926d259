//! Domain errors

use thiserror::Error;

/// Domain result type
pub type Result<T> = std::result::Result<T, DomainError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Receiver not found")]
    ReceiverNotFound,

    #[error("Receiver is blocked")]
    ReceiverBlocked,

    #[error("Room not found")]
    SessionNotFound,

    #[error("{0}")]
    ProviderUnavailable(String),

    #[error("{0}")]
    ProviderRoomNotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::ReceiverNotFound => "receiver_not_found",
            DomainError::ReceiverBlocked => "receiver_blocked",
            DomainError::SessionNotFound => "session_not_found",
            DomainError::ProviderUnavailable(_) => "provider_unavailable",
            DomainError::ProviderRoomNotFound(_) => "provider_room_not_found",
            DomainError::Unauthorized(_) => "unauthorized",
            DomainError::Validation(_) => "validation",
            DomainError::Storage(_) => "storage",
        }
    }
}
