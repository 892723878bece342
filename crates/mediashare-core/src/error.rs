//! Error types for the mediashare-core crate

use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in core metadata operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// A query reached the store without a permission predicate
    #[error("query has no permission predicate")]
    MissingPermission,

    /// Node not found
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// Media record not found
    #[error("media not found: {0}")]
    MediaNotFound(String),

    /// Record already exists
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A required field is missing or malformed
    #[error("validation failed: {0}")]
    Validation(String),

    /// Backing store failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a "no matching record" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NodeNotFound(_) | Self::MediaNotFound(_))
    }
}
