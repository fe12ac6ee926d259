//! HTTP API

pub mod auth;
pub mod error;
pub mod metrics_handler;
pub mod router;
pub mod video_call_dto;
pub mod video_call_handler;

pub use auth::{AuthKeys, AuthUser};
pub use error::{ApiError, MessageResponse};
pub use metrics_handler::{init_metrics, local_handle};
pub use router::build_router;
pub use video_call_handler::AppState;
