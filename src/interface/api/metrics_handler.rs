//! Prometheus metrics handler

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::video_call::ModeFilter;

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

/// Recorder that is not installed globally, for tests
pub fn local_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

fn describe_metrics() {
    describe_counter!(
        "video_sessions_started_total",
        "Total number of video call sessions created"
    );
    describe_counter!(
        "video_sessions_joined_total",
        "Total number of joins into existing sessions"
    );
    describe_counter!(
        "video_sessions_completed_total",
        "Total number of sessions ended through this service"
    );
    describe_counter!(
        "video_session_failures_total",
        "Total number of failed start, join or end requests"
    );
    describe_counter!(
        "call_history_requests_total",
        "Total number of call history reads"
    );
    describe_counter!(
        "call_logs_hidden_total",
        "Total number of call log entries hidden by their owners"
    );
    describe_counter!(
        "notifications_dispatched_total",
        "Total number of call notifications handed to the dispatcher"
    );
}

pub async fn metrics_handler(State(prometheus_handle): State<PrometheusHandle>) -> Response {
    (StatusCode::OK, prometheus_handle.render()).into_response()
}

pub fn record_session_started() {
    counter!("video_sessions_started_total").increment(1);
}

pub fn record_session_joined() {
    counter!("video_sessions_joined_total").increment(1);
}

pub fn record_session_completed() {
    counter!("video_sessions_completed_total").increment(1);
}

/// Record a failed session request
pub fn record_session_failure(reason: &'static str) {
    counter!("video_session_failures_total", "reason" => reason).increment(1);
}

pub fn record_history_request(filter: ModeFilter) {
    let mode = match filter {
        ModeFilter::DirectOnly => "direct",
        ModeFilter::Video => "video",
        ModeFilter::All => "all",
    };
    counter!("call_history_requests_total", "mode" => mode).increment(1);
}

pub fn record_logs_hidden(count: u64) {
    counter!("call_logs_hidden_total").increment(count);
}
