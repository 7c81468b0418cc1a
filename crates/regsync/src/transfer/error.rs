//! Transfer error types.

use thiserror::Error;

use crate::retry::{Cancelled, Retryable};

/// Stderr fragments that indicate a transient failure of the copy tool.
const TRANSIENT_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "connection reset",
    "connection refused",
    "broken pipe",
    "unexpected eof",
    "tls handshake",
    "too many requests",
    "502 bad gateway",
    "503 service unavailable",
    "504 gateway timeout",
    "temporary failure",
];

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("failed to start copy command '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write registry auth file: {0}")]
    AuthFile(#[source] std::io::Error),

    #[error("copy command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    /// Failure reported by an in-process transfer implementation.
    #[error("{message}")]
    Failed { message: String, retryable: bool },

    #[error("transfer cancelled")]
    Cancelled,
}

impl TransferError {
    pub fn transient(message: impl Into<String>) -> Self {
        TransferError::Failed {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        TransferError::Failed {
            message: message.into(),
            retryable: false,
        }
    }
}

impl Retryable for TransferError {
    fn is_retryable(&self) -> bool {
        match self {
            TransferError::CommandFailed { stderr, .. } => {
                let stderr = stderr.to_lowercase();
                TRANSIENT_MARKERS.iter().any(|m| stderr.contains(m))
            }
            TransferError::Failed { retryable, .. } => *retryable,
            TransferError::Spawn { .. } | TransferError::AuthFile(_) | TransferError::Cancelled => {
                false
            }
        }
    }
}

impl From<Cancelled> for TransferError {
    fn from(_: Cancelled) -> Self {
        TransferError::Cancelled
    }
}
