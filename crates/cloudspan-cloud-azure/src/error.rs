//! Azure provider error types

use cloudspan_cloud::CloudError;
use thiserror::Error;

pub const PROVIDER: &str = "azure";

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ARM API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Cloud error: {0}")]
    CloudError(#[from] CloudError),
}

impl From<AzureError> for CloudError {
    fn from(err: AzureError) -> Self {
        match err {
            AzureError::NotFound(what) => CloudError::NotFound(what),
            AzureError::Api {
                status: 404,
                message,
                ..
            } => CloudError::NotFound(message),
            AzureError::Api { code, message, .. } => CloudError::Provider {
                provider: PROVIDER.to_string(),
                code: Some(code),
                message,
            },
            AzureError::InvalidConfig(message) => CloudError::Validation(message),
            AzureError::CloudError(inner) => inner,
            other => CloudError::provider(PROVIDER, other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AzureError>;
