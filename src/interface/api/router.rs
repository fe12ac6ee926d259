//! API Router configuration

use super::metrics_handler::metrics_handler;
use super::video_call_handler::{
    clear_history, clear_recent_history, end_call, get_history, get_recent_history,
    health_check, hide_call_log, start_or_join, AppState,
};
use axum::{
    routing::{delete, get},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the API router
pub fn build_router(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    // Health check route (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    // History routes
    let history_routes = Router::new()
        .route("/video-calls/history", get(get_history).delete(clear_history))
        .route(
            "/video-calls/history/recent",
            get(get_recent_history).delete(clear_recent_history),
        )
        .route("/video-calls/logs/:room_id", delete(hide_call_log));

    // Session lifecycle routes
    let session_routes = Router::new().route(
        "/video-calls/:uname",
        axum::routing::post(start_or_join).delete(end_call),
    );

    // Metrics route (separate state)
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    Router::new()
        .merge(health_routes)
        .merge(history_routes)
        .merge(session_routes)
        .with_state(state)
        .merge(metrics_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
