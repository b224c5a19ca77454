use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{auth::AuthError, repository::StoreError, storage::UploadError};

/// AppError
///
/// The single error type crossing the HTTP boundary. Each layer keeps its own error enum
/// (`StoreError`, `AuthError`, `UploadError`); handlers convert into this one with `?`
/// and the `IntoResponse` impl decides the status code.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or incomplete input, or a write the store refused.
    #[error("{0}")]
    BadRequest(String),

    /// Missing, malformed or expired bearer token.
    #[error("authentication required")]
    Unauthorized,

    /// Body missing, not JSON, or not matching the expected shape.
    #[error("invalid request body: {}", .0.body_text())]
    Json(#[from] JsonRejection),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            // axum would answer 415 or 422.
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(AuthError::InvalidCredentials) => StatusCode::BAD_REQUEST,
            AppError::Auth(AuthError::Token(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            // Every upload failure is reported to the client as a rejected upload.
            AppError::Upload(_) => StatusCode::BAD_REQUEST,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, %status, "request rejected");
        }

        // Internal details stay in the logs.
        let message = match &self {
            AppError::Store(StoreError::Database(_)) => "internal storage error".to_string(),
            AppError::Auth(AuthError::Token(_)) => "could not issue token".to_string(),
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Type alias for handler results.
pub type ApiResult<T> = Result<T, AppError>;
