use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::report::ReportError;
use crate::stats_client::StatsError;
use crate::storage::StorageError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// No artifact matched `(farm_id, index)`. A normal outcome, not a crash.
    #[error("No results: {0}")]
    NoResults(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The temporal statistics service failed. `status` is `None` for transport errors.
    #[error("Upstream error (status {status:?}): {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("S3 error: {0}")]
    S3(String),

    /// The finished report could not be written; no retrieval handle exists.
    #[error("Persist failure: {0}")]
    Persist(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::S3(e.to_string())
    }
}

impl From<StatsError> for AppError {
    fn from(e: StatsError) -> Self {
        match e {
            StatsError::Status { status, .. } => AppError::Upstream {
                status: Some(status),
                message: format!("Failed to fetch temporal graph data. Status code: {status}"),
            },
            other => AppError::Upstream {
                status: None,
                message: format!("Failed to fetch temporal graph data: {other}"),
            },
        }
    }
}

impl From<ReportError> for AppError {
    fn from(e: ReportError) -> Self {
        AppError::Render(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut upstream_status = None;
        let (status, code, message) = match &self {
            AppError::NoResults(msg) => (StatusCode::NOT_FOUND, "NO_RESULTS", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Upstream { status, message } => {
                tracing::error!("Upstream error ({status:?}): {message}");
                upstream_status = *status;
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", message.clone())
            }
            AppError::S3(msg) => {
                tracing::error!("S3 error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "S3_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Persist(msg) => {
                tracing::error!("Persist failure: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSIST_FAILURE",
                    "The report could not be stored".to_string(),
                )
            }
            AppError::Render(msg) => {
                tracing::error!("Render error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "RENDER_ERROR",
                    "The report could not be rendered".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(upstream) = upstream_status {
            error["upstream_status"] = json!(upstream);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
