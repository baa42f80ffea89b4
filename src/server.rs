//! Metrics/health HTTP surface, built on `axum::Router`: a `/health` liveness
//! probe and a
//! `/metrics` endpoint exposing the three adapter-health gauges as JSON.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use hyperfleet_adapter_engine::Metrics;

#[derive(Clone)]
struct AppState {
    metrics: Arc<Metrics>,
}

pub fn router(metrics: Arc<Metrics>) -> Router {
    let state = AppState { metrics };
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "healthy", "version": env!("CARGO_PKG_VERSION")}))
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "lastProcessedUnix": state.metrics.last_processed_unix(),
        "lastSuccessUnix": state.metrics.last_success_unix(),
        "lastFailureUnix": state.metrics.last_failure_unix(),
    }))
}
