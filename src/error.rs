//! Error types for Routewise
//!
//! This module defines the error type shared by the catalog, the routing
//! engine and the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input, rejected before any decision logic runs
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Every candidate was excluded by privacy, tier, budget or health filtering
    #[error("No eligible provider: {0}")]
    NoEligibleProvider(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code, also used as a metrics label
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::NoEligibleProvider(_) => "NO_ELIGIBLE_PROVIDER",
            AppError::ModelNotFound(_) => "MODEL_NOT_FOUND",
            AppError::ProviderNotFound(_) => "PROVIDER_NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::NoEligibleProvider(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::ModelNotFound(_) | AppError::ProviderNotFound(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
