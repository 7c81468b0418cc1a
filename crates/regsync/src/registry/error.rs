//! Registry API error types.

use thiserror::Error;

use crate::retry::{Cancelled, Retryable};

/// Errors that can occur while talking to a registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The registry refused access with the credentials presented.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("repository not found: {0}")]
    NotFound(String),

    #[error("registry returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("invalid registry response: {0}")]
    InvalidResponse(String),

    #[error("invalid authentication challenge: {0}")]
    InvalidChallenge(String),

    #[error("TLS configuration error: {0}")]
    Tls(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl RegistryError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RegistryError::Unauthorized(_))
    }
}

impl Retryable for RegistryError {
    fn is_retryable(&self) -> bool {
        match self {
            RegistryError::Network(_) | RegistryError::Timeout(_) => true,
            RegistryError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<Cancelled> for RegistryError {
    fn from(_: Cancelled) -> Self {
        RegistryError::Cancelled
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RegistryError::Timeout(err.to_string())
        } else if err.is_decode() {
            RegistryError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            RegistryError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            RegistryError::Network(err.to_string())
        }
    }
}
