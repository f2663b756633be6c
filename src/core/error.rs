use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::telegram::ForwardError;

/// Request-boundary error taxonomy
///
/// Every failure inside the upload pipeline ends up as one of these variants.
/// The HTTP status and the log level are decided here, once, in
/// [`IntoResponse::into_response`]. Response bodies only ever contain the
/// public message, never the underlying cause.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed, missing or disallowed client input
    #[error("{0}")]
    BadRequest(String),

    /// Upload exceeds the configured byte ceiling
    #[error("File too large")]
    PayloadTooLarge,

    /// Shared secret missing or wrong
    #[error("Unauthorized")]
    Unauthorized,

    /// Required settings absent or malformed at time of use
    #[error("Server missing required configuration: {}", .0.join("; "))]
    ConfigInvalid(Vec<String>),

    /// The Bot API rejected or failed the send
    #[error("Telegram forwarding failed: {0}")]
    Upstream(#[from] ForwardError),

    /// Anything unanticipated, including filesystem failures
    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::ConfigInvalid(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the uploader.
    pub fn public_message(&self) -> String {
        match self {
            AppError::BadRequest(message) => message.clone(),
            AppError::PayloadTooLarge | AppError::Unauthorized => self.to_string(),
            AppError::ConfigInvalid(_) => "Server missing required configuration".to_string(),
            AppError::Upstream(_) => "Failed to forward file upstream".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    fn log(&self) {
        match self {
            AppError::BadRequest(_) | AppError::PayloadTooLarge | AppError::Unauthorized => {
                log::debug!("Upload rejected: {}", self);
            }
            AppError::ConfigInvalid(_) => log::warn!("Upload refused: {}", self),
            AppError::Upstream(e) => log::error!("Upload forwarding failed: {:?}", e),
            AppError::Internal(e) => log::error!("Upload failed with internal error: {:?}", e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        (self.status_code(), Json(json!({ "error": self.public_message() }))).into_response()
    }
}
