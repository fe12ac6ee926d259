//! Video call API handlers

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        FromRef, Path, Query, State,
    },
    Json,
};
use tracing::info;
use uuid::Uuid;

use super::auth::{AuthKeys, AuthUser};
use super::error::{ApiError, MessageResponse};
use super::metrics_handler::{
    record_history_request, record_logs_hidden, record_session_completed, record_session_failure,
    record_session_joined, record_session_started,
};
use super::video_call_dto::{
    HideLogQuery, HistoryQuery, HistoryResponse, SessionViewResponse, StartCallRequest,
};
use crate::application::{
    Ack, CallHistoryAggregator, CallSessionManager, HideOutcome, RECENT_CLEAR_LIMIT,
};
use crate::domain::shared::{DomainError, UniqueName};
use crate::domain::video_call::ModeFilter;

/// Entries returned by the recent history endpoint
const RECENT_HISTORY_LIMIT: usize = 3;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<CallSessionManager>,
    pub history: Arc<CallHistoryAggregator>,
    pub auth: AuthKeys,
}

impl FromRef<AppState> for AuthKeys {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn hidden_or(outcome: HideOutcome, done: &str, absent: &str) -> ApiResult<MessageResponse> {
    match outcome {
        HideOutcome::Hidden(n) => {
            record_logs_hidden(n);
            Ok(Json(MessageResponse::new(done)))
        }
        HideOutcome::NothingToDelete => Err(ApiError::rejected(absent)),
    }
}

/// `?mode=` with `all` as the default
fn parse_mode(mode: Option<&str>) -> Result<ModeFilter, ApiError> {
    match mode {
        None => Ok(ModeFilter::All),
        Some(mode) => ModeFilter::from_str(mode)
            .ok_or_else(|| ApiError::rejected(format!("Unknown mode {}", mode))),
    }
}

fn session_failure(err: DomainError) -> ApiError {
    record_session_failure(err.kind());
    err.into()
}

/// Call history, newest first
pub async fn get_history(
    State(state): State<AppState>,
    auth: AuthUser,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<HistoryResponse> {
    let Query(query) = query?;
    let filter = parse_mode(query.mode.as_deref())?;
    info!(
        "API: History for {} (mode: {:?}, limit: {:?})",
        auth.user_id, filter, query.limit
    );
    record_history_request(filter);

    let entries = state
        .history
        .fetch_history(auth.user_id, filter, query.limit.map(|l| l.max(0)))
        .await?;
    let history = state.history.summaries(auth.user_id, entries).await?;
    Ok(Json(HistoryResponse { history }))
}

/// The three most recent calls of any kind
pub async fn get_recent_history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<HistoryResponse> {
    info!("API: Recent history for {}", auth.user_id);
    record_history_request(ModeFilter::All);

    let entries = state
        .history
        .fetch_recent(auth.user_id, RECENT_HISTORY_LIMIT)
        .await?;
    let history = state.history.summaries(auth.user_id, entries).await?;
    Ok(Json(HistoryResponse { history }))
}

pub async fn clear_recent_history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<MessageResponse> {
    info!("API: Clearing recent history for {}", auth.user_id);
    let outcome = state
        .history
        .hide_recent(auth.user_id, RECENT_CLEAR_LIMIT)
        .await?;
    hidden_or(outcome, "Recent Call log deleted", "Recent Call log is not present")
}

pub async fn clear_history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<MessageResponse> {
    info!("API: Clearing all history for {}", auth.user_id);
    let outcome = state.history.hide_all(auth.user_id).await?;
    hidden_or(outcome, "Call logs cleared!", "Call logs already empty")
}

/// Hide one log entry; `?mode=video` or `?mode=direct` restricts it to
/// direct video calls
pub async fn hide_call_log(
    State(state): State<AppState>,
    auth: AuthUser,
    room_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<HideLogQuery>, QueryRejection>,
) -> ApiResult<MessageResponse> {
    let Path(room_id) = room_id?;
    let Query(query) = query?;
    let filter = parse_mode(query.mode.as_deref())?;
    info!("API: Hiding call log {} for {}", room_id, auth.user_id);

    let outcome = match filter {
        ModeFilter::DirectOnly | ModeFilter::Video => {
            state.history.hide_direct(room_id, auth.user_id).await?
        }
        ModeFilter::All => state.history.hide_any(room_id, auth.user_id).await?,
    };
    hidden_or(outcome, "Call log deleted", "Call log is not present")
}

/// Join the named session, or start it with `contact_id`
pub async fn start_or_join(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(uname): Path<String>,
    body: Option<Json<StartCallRequest>>,
) -> ApiResult<SessionViewResponse> {
    let unique_name = UniqueName::parse(&uname).map_err(session_failure)?;
    let contact_id = body.and_then(|Json(b)| b.contact_id);
    info!("API: {} starting or joining {}", auth.user_id, unique_name);

    let view = state
        .sessions
        .start_or_join(&unique_name, contact_id, auth.user_id)
        .await
        .map_err(session_failure)?;

    if view.created {
        record_session_started();
    } else {
        record_session_joined();
    }
    Ok(Json(view.into()))
}

pub async fn end_call(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(uname): Path<String>,
) -> ApiResult<MessageResponse> {
    info!("API: {} ending {}", auth.user_id, uname);

    match state
        .sessions
        .complete(&uname, auth.user_id)
        .await
        .map_err(session_failure)?
    {
        ack @ Ack::Completed => {
            record_session_completed();
            Ok(Json(MessageResponse::new(ack.message())))
        }
        ack @ Ack::AlreadyCompleted => Err(ApiError::rejected(ack.message())),
    }
}

pub async fn health_check() -> Json<MessageResponse> {
    Json(MessageResponse::new("OK"))
}
