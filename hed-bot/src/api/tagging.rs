//! Tagging endpoints
//!
//! `POST /api/tag` runs the whole pipeline through the language model;
//! `POST /api/reduce` only validates and reduces a caller's annotation.

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::services::{ReduceOutcome, TagOutcome};
use crate::{ApiError, ApiResult, AppState};

/// POST /api/tag request
#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub description: String,
}

/// POST /api/reduce request
#[derive(Debug, Deserialize)]
pub struct ReduceRequest {
    pub annotation: String,
}

/// POST /api/tag
pub async fn recommend_tags(
    State(state): State<AppState>,
    Json(request): Json<TagRequest>,
) -> ApiResult<Json<TagOutcome>> {
    let request_id = Uuid::new_v4();
    info!(%request_id, chars = request.description.len(), "Tagging request received");

    match state.tagging.tag(&request.description).await {
        Ok(outcome) => {
            info!(%request_id, "Tagging request completed");
            Ok(Json(outcome))
        }
        Err(e) => {
            error!(%request_id, "Tagging failed: {}", e);
            state.record_error(e.to_string()).await;
            Err(ApiError::from(e))
        }
    }
}

/// POST /api/reduce
pub async fn reduce_annotation(
    State(state): State<AppState>,
    Json(request): Json<ReduceRequest>,
) -> ApiResult<Json<ReduceOutcome>> {
    match state.tagging.reduce_text(&request.annotation) {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            state.record_error(e.to_string()).await;
            Err(ApiError::from(e))
        }
    }
}

/// Build tagging routes
pub fn tagging_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tag", post(recommend_tags))
        .route("/api/reduce", post(reduce_annotation))
}
