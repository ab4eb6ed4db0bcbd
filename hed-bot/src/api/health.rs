//! Health check endpoint
//!
//! Reports liveness together with what the service is serving: the loaded
//! schema release and size, and the model behind `/api/tag`.

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// `GET /health` body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    /// hed-bot crate version
    pub version: &'static str,
    pub uptime_seconds: u64,
    /// `version` attribute of the loaded HED document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    pub tag_count: usize,
    /// Proposer model used for tagging requests
    pub model: String,
    /// Most recent request failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;
    let schema = state.tagging.schema();

    Json(HealthResponse {
        status: "ok",
        module: "hed-bot",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
        schema_version: schema.version().map(str::to_string),
        tag_count: schema.len(),
        model: state.tagging.model().to_string(),
        last_error: state.last_error.read().await.clone(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
