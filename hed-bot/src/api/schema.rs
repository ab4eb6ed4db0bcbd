//! Schema browsing endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::{ApiError, ApiResult, AppState};

/// Schema summary
#[derive(Debug, Serialize)]
pub struct SchemaInfoResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub tag_count: usize,
    pub top_level: Vec<String>,
}

/// One schema node with its neighbourhood
#[derive(Debug, Serialize)]
pub struct TagInfoResponse {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Nearest first
    pub ancestors: Vec<String>,
    pub children: Vec<String>,
}

/// GET /api/schema
pub async fn schema_info(State(state): State<AppState>) -> Json<SchemaInfoResponse> {
    let schema = state.tagging.schema();

    Json(SchemaInfoResponse {
        version: schema.version().map(str::to_string),
        tag_count: schema.len(),
        top_level: schema.top_level().map(|n| n.name().to_string()).collect(),
    })
}

/// GET /api/tags/:name
pub async fn tag_info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<TagInfoResponse>> {
    let schema = state.tagging.schema();
    let node = schema
        .get(&name)
        .ok_or_else(|| ApiError::NotFound(format!("tag {}", name)))?;

    let ancestors = schema
        .ancestors(&name)?
        .into_iter()
        .map(str::to_string)
        .collect();

    Ok(Json(TagInfoResponse {
        name: node.name().to_string(),
        description: node.description().map(str::to_string),
        ancestors,
        children: schema
            .children_of(node)
            .map(|c| c.name().to_string())
            .collect(),
    }))
}

/// Build schema routes
pub fn schema_routes() -> Router<AppState> {
    Router::new()
        .route("/api/schema", get(schema_info))
        .route("/api/tags/:name", get(tag_info))
}
