use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::AppState;

pub const SERVICE_NAME: &str = "tunnel";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthReport {
    pub status: String,
    pub service: String,
    pub upload_endpoint: String,
    pub missing_env: Vec<String>,
    pub auth: String,
    pub forwarder: String,
}

/// GET /: liveness plus which required settings are missing.
pub async fn status_handler(State(state): State<AppState>) -> Json<HealthReport> {
    let missing: Vec<String> = state
        .settings
        .missing_required()
        .into_iter()
        .map(str::to_string)
        .collect();

    Json(HealthReport {
        status: if missing.is_empty() { "healthy" } else { "degraded" }.to_string(),
        service: SERVICE_NAME.to_string(),
        upload_endpoint: "/upload".to_string(),
        missing_env: missing,
        auth: if state.settings.upload_secret.is_some() { "enabled" } else { "disabled" }.to_string(),
        forwarder: if state.clients.is_initialized() { "ready" } else { "idle" }.to_string(),
    })
}

/// GET /health: simple health check.
pub async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
