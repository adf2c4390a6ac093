//! Error types for the HTTP layer
//!
//! Every handler returns [`AppResult`]. Errors render as the storefront's
//! JSON envelope `{ "success": false, "message": ..., "errors"?: [...] }`
//! with a status code chosen by variant. Internal details are logged but
//! never sent to the client.

use std::any::Any;

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Request or record failed schema rules (400, with message list)
    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// Malformed request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid API key / bearer token (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Record does not exist (404)
    #[error("{0}")]
    NotFound(String),

    /// Request body over the route's limit (413)
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Attachment could not be stored (502)
    #[error("Upload failed: {0}")]
    Upload(#[from] StorageError),

    /// Embedded database failure (500)
    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    /// A stored record could not be (de)serialized (500)
    #[error("Record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Anything else (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result alias used by every handler
pub type AppResult<T> = Result<T, AppError>;

/// JSON body of every error response
#[derive(Serialize, Debug)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: None,
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Upload(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Encoding(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let envelope = match &self {
            AppError::Validation(messages) => ErrorEnvelope {
                success: false,
                message: "Validation failed".to_string(),
                errors: Some(messages.clone()),
            },
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::PayloadTooLarge(msg) => ErrorEnvelope::new(msg.clone()),
            AppError::Upload(_) => ErrorEnvelope::new("Failed to upload documents"),
            AppError::Database(_) | AppError::Encoding(_) | AppError::Internal(_) => {
                ErrorEnvelope::new("Internal server error")
            }
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, Json(envelope)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge("Uploaded files are too large".to_string());
        }
        AppError::BadRequest(format!("Invalid multipart payload: {}", err.body_text()))
    }
}

// redb reports each layer with its own type; fold them into `redb::Error`.
macro_rules! impl_from_redb {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for AppError {
                fn from(err: $ty) -> Self {
                    AppError::Database(err.into())
                }
            }
        )*
    };
}

impl_from_redb!(
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Converts a panicking handler into a 500 envelope
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorEnvelope::new("Internal server error")),
    )
        .into_response()
}
