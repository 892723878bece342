//! Client error types

use crate::types::{ErrorBody, ShareFailures};
use mediashare_core::FailedShare;
use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The remote rejected our credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The remote does not know the resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Some (file, group) pairs failed
    #[error("{} share operation(s) failed", .0.len())]
    PartialFailure(Vec<FailedShare>),

    /// Any other non-success status
    #[error("Unexpected status {status}: {message}")]
    Status { status: u16, message: String },
}

impl ClientError {
    /// Check if the request timed out
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }

    /// Check if the request never got an HTTP answer
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// HTTP status of the answer, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED.as_u16()),
            Self::NotFound(_) => Some(StatusCode::NOT_FOUND.as_u16()),
            Self::PartialFailure(_) => Some(StatusCode::CONFLICT.as_u16()),
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Config(_) => None,
        }
    }

    /// Build an error from a non-success response body
    pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
        if status == StatusCode::CONFLICT {
            if let Ok(failures) = serde_json::from_str::<ShareFailures>(body) {
                return Self::PartialFailure(failures.failed);
            }
        }

        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|e| e.message)
            .unwrap_or_else(|_| body.to_string());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized(message),
            StatusCode::NOT_FOUND => Self::NotFound(message),
            _ => Self::Status {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_failure() {
        let body = r#"{"failed":[{"filename":"f.jpg","group":"family","reason":"missing"}]}"#;
        match ClientError::from_response(StatusCode::CONFLICT, body) {
            ClientError::PartialFailure(failed) => {
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].group, "family");
            }
            other => panic!("Expected PartialFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_body() {
        let body = r#"{"code":"AccessDenied","message":"bad secret","request_id":"r1"}"#;
        let error = ClientError::from_response(StatusCode::UNAUTHORIZED, body);
        assert!(matches!(error, ClientError::Unauthorized(ref m) if m == "bad secret"));
        assert_eq!(error.status(), Some(401));
    }

    #[test]
    fn test_plain_text_body() {
        let error = ClientError::from_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(
            error,
            ClientError::Status { status: 502, ref message } if message == "upstream down"
        ));
    }
}
