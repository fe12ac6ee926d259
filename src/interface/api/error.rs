//! API error rendering
//!
//! Every failure and every "nothing happened" outcome goes out as
//! `401 {"message": ...}`. Clients treat it as retriable.

use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::domain::shared::DomainError;

/// `{message}` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    message: String,
}

impl ApiError {
    /// Informational rejection, e.g. nothing to delete
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let message = match &err {
            DomainError::Storage(_) => {
                error!("Request failed: {}", err);
                "Something went wrong".to_string()
            }
            DomainError::Unauthorized(msg) => {
                warn!("Request rejected: {}", msg);
                msg.clone()
            }
            DomainError::Validation(msg) => msg.clone(),
            _ => {
                warn!("Request rejected: {}", err);
                err.to_string()
            }
        };
        Self { message }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        warn!("Bad path: {}", rejection.body_text());
        Self::rejected("Invalid id")
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::rejected(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(MessageResponse::new(self.message)),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_are_not_leaked() {
        let err = ApiError::from(DomainError::Storage("relation rooms missing".to_string()));
        assert_eq!(err.message(), "Something went wrong");
    }

    #[test]
    fn test_domain_messages_pass_through() {
        assert_eq!(
            ApiError::from(DomainError::ReceiverBlocked).message(),
            "Receiver is blocked"
        );
        assert_eq!(
            ApiError::from(DomainError::ProviderRoomNotFound(
                "The requested resource was not found".to_string()
            ))
            .message(),
            "The requested resource was not found"
        );
    }
}
