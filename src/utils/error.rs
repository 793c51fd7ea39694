use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Credential issuance failed: {0}")]
    IssuanceFailed(String),

    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Storage error")]
    StorageError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::IssuanceFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DeliveryFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidPayload(_) => "INVALID_PAYLOAD",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::IssuanceFailed(_) => "ISSUANCE_FAILED",
            AppError::DeliveryFailed(_) => "DELIVERY_FAILED",
            AppError::StorageError(_) => "STORAGE_FAILED",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::InvalidPayload(msg)
            | AppError::AuthError(msg)
            | AppError::NotFound(msg)
            | AppError::IssuanceFailed(msg)
            | AppError::DeliveryFailed(msg)
            | AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::StorageError(e) => {
                error!(error = ?e, "Storage error");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::InvalidPayload(msg)
            | AppError::AuthError(msg)
            | AppError::NotFound(msg)
            | AppError::IssuanceFailed(msg)
            | AppError::DeliveryFailed(msg)
            | AppError::InternalServerError(msg) => msg.clone(),
            AppError::StorageError(_) => "A storage error occurred".to_string(),
        };

        // Do not expose internal details in the API response
        let details = None;

        error_response(code, public_message, details, status)
    }
}
