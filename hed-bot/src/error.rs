//! Error types for hed-bot

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::TaggingError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Annotation names a tag outside the schema (400)
    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    /// Annotation text is not well-formed (422)
    #[error("Malformed annotation: {0}")]
    MalformedAnnotation(String),

    /// Language model call failed or gave nothing usable (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<hed_common::Error> for ApiError {
    fn from(err: hed_common::Error) -> Self {
        match err {
            hed_common::Error::UnknownTag(tag) => ApiError::UnknownTag(tag),
            hed_common::Error::MalformedAnnotation(msg) => ApiError::MalformedAnnotation(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<TaggingError> for ApiError {
    fn from(err: TaggingError) -> Self {
        match err {
            TaggingError::EmptyDescription => ApiError::BadRequest(err.to_string()),
            TaggingError::Proposer(_) | TaggingError::NoAnnotation => {
                ApiError::Upstream(err.to_string())
            }
            TaggingError::Hed(inner) => inner.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::UnknownTag(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_TAG"),
            ApiError::MalformedAnnotation(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "MALFORMED_ANNOTATION")
            }
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
