//! Cloud driver error types

use std::time::Duration;
use thiserror::Error;

/// Errors returned by every driver operation
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Provider error ({provider}): {message}")]
    Provider {
        provider: String,
        code: Option<String>,
        message: String,
    },

    #[error("Operation '{operation}' finished in state {status}: {message}")]
    OperationFailed {
        operation: String,
        status: String,
        message: String,
    },

    #[error("Operation '{operation}' did not finish after {polls} polls ({waited:?})")]
    OperationTimeout {
        operation: String,
        polls: u32,
        waited: Duration,
    },

    #[error("Listing is incomplete, {} branch(es) skipped: {}", skipped.len(), skipped.join(", "))]
    PartialResult { skipped: Vec<String> },

    #[error("Cancelled while waiting for '{0}'; the provider operation may still complete")]
    Cancelled(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    AlreadyExists,
    NotFound,
    Provider,
    PartialResult,
    Cancelled,
    /// Local storage or key generation failure
    Local,
}

impl CloudError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        CloudError::Provider {
            provider: provider.into(),
            code: None,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CloudError::Validation(_) => ErrorKind::Validation,
            CloudError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            CloudError::NotFound(_) => ErrorKind::NotFound,
            CloudError::Provider { .. }
            | CloudError::OperationFailed { .. }
            | CloudError::OperationTimeout { .. } => ErrorKind::Provider,
            CloudError::PartialResult { .. } => ErrorKind::PartialResult,
            CloudError::Cancelled(_) => ErrorKind::Cancelled,
            CloudError::KeyGeneration(_) | CloudError::Io(_) | CloudError::Json(_) => {
                ErrorKind::Local
            }
        }
    }

    /// Whether a caller may reasonably retry the same call
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CloudError::Provider { .. } | CloudError::OperationTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
