//! Error types for the conversion service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Conversion service errors
#[derive(Debug, Error)]
pub enum Error {
    /// File extension is not one of pdf, doc, docx
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// A single cascade stage failed
    #[error("Strategy '{strategy}' failed: {message}")]
    StrategyFailure { strategy: String, message: String },

    /// Every stage of a cascade failed
    #[error("{message}")]
    ConversionExhausted { filename: String, message: String },

    /// Error outside the per-file loop, aborts the job
    #[error("Job failed: {0}")]
    JobFailure(String),

    /// Job or output file missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed client request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a strategy failure
    pub fn strategy(strategy: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StrategyFailure {
            strategy: strategy.into(),
            message: message.into(),
        }
    }

    /// Create a cascade exhaustion error
    pub fn exhausted(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConversionExhausted {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Internal(format!("Archive error: {}", err))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::UnsupportedFormat(ext) => (
                StatusCode::BAD_REQUEST,
                "unsupported_type",
                format!("Unsupported file type: {}", ext),
            ),
            Error::StrategyFailure { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "strategy_failure",
                self.to_string(),
            ),
            Error::ConversionExhausted { filename, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "conversion_failed",
                format!("{}: {}", filename, message),
            ),
            Error::JobFailure(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "job_failed", msg.clone())
            }
            Error::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Not found: {}", what),
            ),
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone()),
            Error::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg.clone()),
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
