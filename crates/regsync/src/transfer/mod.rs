//! The image transfer collaborator.

pub mod auth_file;
pub mod command;
pub mod error;
pub mod options;

use async_trait::async_trait;

pub use auth_file::AuthFile;
pub use command::{CommandTransfer, DEFAULT_COPY_COMMAND};
pub use error::TransferError;
pub use options::{ImageListSelection, ManifestFormat, TransferOptions};

use crate::context::ConnectionContext;
use crate::reference::ImageReference;

/// Everything needed to copy one image.
#[derive(Debug, Clone, Copy)]
pub struct TransferRequest<'a> {
    pub source: &'a ImageReference,
    pub destination: &'a ImageReference,
    pub source_context: &'a ConnectionContext,
    pub destination_context: &'a ConnectionContext,
    pub options: &'a TransferOptions,
}

/// Copies one image from a source reference to a destination reference.
#[async_trait]
pub trait ImageTransfer: Send + Sync {
    async fn transfer(&self, request: &TransferRequest<'_>) -> Result<(), TransferError>;
}
