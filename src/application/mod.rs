//! Application layer - Use cases and application services
//!
//! This layer orchestrates domain objects to fulfill use cases:
//! - Driving the call session state machine against the media provider
//! - Merging and shaping call history
//! - Handing notifications to the delivery worker

pub mod call_history;
pub mod call_session;
pub mod notification_queue;

pub use call_history::{CallHistoryAggregator, HideOutcome, RECENT_CLEAR_LIMIT};
pub use call_session::{Ack, CallSessionManager, SessionView};
pub use notification_queue::{DispatchJob, NotificationQueue};
