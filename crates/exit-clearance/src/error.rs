use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::clearance::ClearanceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Top-level failure for the clearance binaries.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("clearance error: {0}")]
    Clearance(#[from] ClearanceError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Clearance(err) => err.status_code(),
            AppError::Config(_) | AppError::Telemetry(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Startup and io failures stay in the log.
        let message = match &self {
            AppError::Clearance(err) => err.to_string(),
            other => {
                error!(error = %other, "internal failure");
                "internal error".to_string()
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
