//! Video call bounded context - call sessions, group calls and call history

pub mod group;
pub mod history;
pub mod notification;
pub mod provider;
pub mod repository;
pub mod session;

pub use group::{GroupCallSession, Participation};
pub use history::{
    merge_streams, ContactSummary, DirectCallSummary, GroupCallSummary, HistoryEntry,
    HistoryEntrySummary, MemberSummary, ModeFilter,
};
pub use notification::{
    DispatchContext, DispatchError, Notification, NotificationDispatcher, NotificationKind,
    NotificationRepository,
};
pub use provider::{
    AccessToken, CreateRoom, MediaProviderClient, ProviderError, ProviderRoom, RoomStatus,
};
pub use repository::{CallSessionRepository, GroupCallRepository, InsertOutcome};
pub use session::{CallDirection, CallMode, CallSession, PartyRole, SessionStatus};
