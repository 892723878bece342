//! Error types and API error codes

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mediashare_client::{ClientError, ErrorBody, ShareFailures};
use mediashare_core::{CoreError, FailedShare};
use thiserror::Error;

/// API error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    AccessDenied,
    AuthenticationFailed,
    InvalidToken,
    InvalidRequest,
    NotFound,
    Conflict,
    NodeUnavailable,
    Timeout,
    SlowDown,
    InternalError,
}

impl ErrorCode {
    /// Get the error code string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::AuthenticationFailed => "AuthenticationFailed",
            Self::InvalidToken => "InvalidToken",
            Self::InvalidRequest => "InvalidRequest",
            Self::NotFound => "NotFound",
            Self::Conflict => "Conflict",
            Self::NodeUnavailable => "NodeUnavailable",
            Self::Timeout => "Timeout",
            Self::SlowDown => "SlowDown",
            Self::InternalError => "InternalError",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::AuthenticationFailed | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::NodeUnavailable => StatusCode::BAD_GATEWAY,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::SlowDown => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Api {
        code: ErrorCode,
        message: String,
        request_id: String,
    },

    #[error("{} share operation(s) failed", .0.len())]
    PartialFailure(Vec<FailedShare>),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Node error: {0}")]
    Node(#[from] ClientError),
}

impl ApiError {
    /// Create a new API error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Invalid input
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Resource absent or not visible to the caller
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Get the error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Api { code, .. } => *code,
            Self::PartialFailure(_) => ErrorCode::Conflict,
            Self::Core(e) => match e {
                CoreError::NodeNotFound(_) | CoreError::MediaNotFound(_) => ErrorCode::NotFound,
                CoreError::AlreadyExists(_) => ErrorCode::Conflict,
                CoreError::Validation(_) => ErrorCode::InvalidRequest,
                CoreError::MissingPermission | CoreError::Storage(_) => ErrorCode::InternalError,
            },
            Self::Node(e) => match e {
                e if e.is_timeout() => ErrorCode::Timeout,
                ClientError::NotFound(_) => ErrorCode::NotFound,
                ClientError::PartialFailure(_) => ErrorCode::Conflict,
                ClientError::Status { status: 400, .. } => ErrorCode::InvalidRequest,
                ClientError::Status { status: 409, .. } => ErrorCode::Conflict,
                _ => ErrorCode::NodeUnavailable,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        let status = code.status_code();

        let failed = match self {
            Self::PartialFailure(failed) | Self::Node(ClientError::PartialFailure(failed)) => {
                failed
            }
            other => {
                let request_id = match &other {
                    Self::Api { request_id, .. } => request_id.clone(),
                    _ => uuid::Uuid::new_v4().to_string(),
                };
                if status.is_server_error() {
                    tracing::error!(code = code.as_str(), error = %other, "Request failed");
                }
                let body = ErrorBody {
                    code: code.as_str().to_string(),
                    message: other.to_string(),
                    request_id: Some(request_id),
                };
                return (status, Json(body)).into_response();
            }
        };

        (status, Json(ShareFailures { failed })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_codes() {
        assert_eq!(
            ApiError::from(CoreError::MediaNotFound("m1".into())).error_code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            ApiError::from(CoreError::MissingPermission).error_code(),
            ErrorCode::InternalError
        );
        assert_eq!(
            ApiError::from(CoreError::validation("empty")).error_code(),
            ErrorCode::InvalidRequest
        );
    }

    #[test]
    fn test_partial_failure_is_conflict() {
        let error = ApiError::PartialFailure(vec![FailedShare::new("f.jpg", "g", "missing")]);
        assert_eq!(error.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_node_conflict_is_conflict() {
        let error = ApiError::from(ClientError::Status {
            status: 409,
            message: "f.jpg already exists".into(),
        });
        assert_eq!(error.error_code(), ErrorCode::Conflict);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorCode::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            ErrorCode::AuthenticationFailed.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ErrorCode::SlowDown.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }
}
