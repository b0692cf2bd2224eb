//! Application error type and its HTTP rendering
//!
//! Every handler returns `Result<_, AppError>`. Expected outcomes (bad input,
//! unknown ids, missing credentials) map to 4xx with a readable message, while
//! rendering and storage failures are logged and reported as a generic 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::database::StoreError;
use crate::render::RenderError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or malformed request input
    #[error("{0}")]
    Validation(String),

    /// Unknown short id, or a record the caller does not own
    #[error("{0}")]
    NotFound(String),

    /// Missing or invalid bearer credential on an owner-scoped route
    #[error("unauthorized")]
    Unauthorized,

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Writing an uploaded file to disk failed
    #[error("upload write failed: {0}")]
    Upload(#[source] std::io::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound("QR not found".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            Self::Render(err) => {
                tracing::error!(error = %err, "render error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to render QR code".to_string(),
                )
            }
            Self::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Self::Upload(err) => {
                tracing::error!(error = %err, "upload write failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
