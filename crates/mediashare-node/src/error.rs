//! Error types and API error codes

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mediashare_client::{ErrorBody, ShareFailures};
use mediashare_core::{CoreError, FailedShare};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, NodeError>;

/// API error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Unauthorized,
    InvalidRequest,
    NotFound,
    Conflict,
    InternalError,
}

impl ErrorCode {
    /// Get the error code string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Unauthorized",
            Self::InvalidRequest => "InvalidRequest",
            Self::NotFound => "NotFound",
            Self::Conflict => "Conflict",
            Self::InternalError => "InternalError",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Node errors
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("{message}")]
    Api { code: ErrorCode, message: String },

    /// Some (file, group) pairs failed; the rest were processed
    #[error("{} share operation(s) failed", .0.len())]
    PartialFailure(Vec<FailedShare>),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rule encoding error: {0}")]
    Rule(#[from] toml::ser::Error),
}

impl NodeError {
    /// Create a new API error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    /// Missing or wrong credentials
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Invalid input
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Resource absent
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Get the error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Api { code, .. } => *code,
            Self::PartialFailure(_) => ErrorCode::Conflict,
            Self::Core(CoreError::Validation(_)) => ErrorCode::InvalidRequest,
            Self::Core(e) if e.is_not_found() => ErrorCode::NotFound,
            Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ErrorCode::NotFound,
            Self::Core(_) | Self::Io(_) | Self::Rule(_) => ErrorCode::InternalError,
        }
    }
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        let status = code.status_code();

        if let Self::PartialFailure(failed) = self {
            return (status, Json(ShareFailures { failed })).into_response();
        }

        if status.is_server_error() {
            tracing::error!(code = code.as_str(), error = %self, "Request failed");
        }
        let body = ErrorBody {
            code: code.as_str().to_string(),
            message: self.to_string(),
            request_id: Some(uuid::Uuid::new_v4().to_string()),
        };
        (status, Json(body)).into_response()
    }
}
