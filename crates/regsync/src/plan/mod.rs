//! Turns a sync source into an ordered [`SyncPlan`].

pub mod descriptor;
pub mod directory;
pub mod expander;
pub mod resolver;

pub use descriptor::{RepoDescriptor, SyncPlan};
pub use directory::find_image_directories;
pub use expander::RegistryExpander;
pub use resolver::RepositoryResolver;

use tracing::warn;

use crate::context::ConnectionContext;
use crate::error::{Result, SyncError};
use crate::progress::{ProgressReporter, SyncEvent};
use crate::reference::RegistryReference;
use crate::registry::TagLister;

/// Lists the tags of `repository` as tagged references, in listing order.
///
/// A registry that refuses to list tags yields an empty list; every other
/// listing failure is returned as [`SyncError::TagListing`].
pub async fn list_repository_tags(
    tag_lister: &dyn TagLister,
    ctx: &ConnectionContext,
    repository: &RegistryReference,
    progress: &dyn ProgressReporter,
) -> Result<Vec<RegistryReference>> {
    let name = repository.name();
    progress.report(SyncEvent::ListingTags {
        repository: name.clone(),
    });

    let tags = match tag_lister.list_tags(ctx, repository).await {
        Ok(tags) => tags,
        Err(e) if e.is_unauthorized() => {
            progress.report(SyncEvent::TagListingDenied {
                repository: name,
                reason: e.to_string(),
            });
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(SyncError::TagListing {
                repository: name,
                source: e,
            })
        }
    };

    tags.iter()
        .map(|tag| {
            repository.with_tag(tag).map_err(|e| {
                warn!(repo = %name, tag = %tag, "Registry returned an invalid tag");
                SyncError::Reference(e)
            })
        })
        .collect()
}
