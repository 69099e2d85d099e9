use crate::services::metrics;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "assistant-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Ready once the artifact directory is reachable. Prompts are loaded before
/// the state exists, so they need no check here.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match tokio::fs::try_exists(&state.config.storage.artifacts_dir).await {
        Ok(true) => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub async fn metrics_handler() -> impl IntoResponse {
    metrics::get_metrics()
}
