//! Registry collaborators used during planning.

pub mod auth;
pub mod client;
pub mod error;

use async_trait::async_trait;

pub use auth::Challenge;
pub use client::HttpTagLister;
pub use error::RegistryError;

use crate::context::ConnectionContext;
use crate::reference::RegistryReference;

/// Lists the tags of one registry repository.
///
/// Implementations must report a refusal to list as
/// [`RegistryError::Unauthorized`] so callers can treat it as an empty result.
#[async_trait]
pub trait TagLister: Send + Sync {
    async fn list_tags(
        &self,
        ctx: &ConnectionContext,
        repository: &RegistryReference,
    ) -> Result<Vec<String>, RegistryError>;
}
