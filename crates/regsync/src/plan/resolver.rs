//! Resolution of a sync source into a [`SyncPlan`].

use std::path::Path;

use tracing::{debug, info};

use super::descriptor::{RepoDescriptor, SyncPlan};
use super::directory::find_image_directories;
use super::expander::RegistryExpander;
use super::list_repository_tags;
use crate::config::load_source_config;
use crate::context::ConnectionContext;
use crate::error::{Result, SyncError};
use crate::progress::{ProgressReporter, SyncEvent};
use crate::reference::{DirectoryReference, ImageReference, RegistryReference};
use crate::registry::TagLister;
use crate::transport::SourceTransport;

pub struct RepositoryResolver<'a> {
    tag_lister: &'a dyn TagLister,
    progress: &'a dyn ProgressReporter,
}

impl<'a> RepositoryResolver<'a> {
    pub fn new(tag_lister: &'a dyn TagLister, progress: &'a dyn ProgressReporter) -> Self {
        Self {
            tag_lister,
            progress,
        }
    }

    /// Resolves `source`, interpreted according to `transport`.
    pub async fn resolve(
        &self,
        source: &str,
        transport: SourceTransport,
        base: &ConnectionContext,
    ) -> Result<SyncPlan> {
        debug!(source = %source, transport = %transport, "Resolving source");
        match transport {
            SourceTransport::Docker => self.resolve_registry(source, base).await,
            SourceTransport::Dir => self.resolve_directory(source, base),
            SourceTransport::Yaml => self.resolve_config(source, base).await,
        }
    }

    async fn resolve_registry(&self, source: &str, base: &ConnectionContext) -> Result<SyncPlan> {
        let named = RegistryReference::parse_normalized(source)?;
        let tagged = !named.is_name_only();
        self.progress.report(SyncEvent::TagPresenceChecked {
            image: source.to_string(),
            tagged,
        });

        let image_refs: Vec<ImageReference> = if tagged {
            vec![named.into()]
        } else {
            list_repository_tags(self.tag_lister, base, &named, self.progress)
                .await?
                .into_iter()
                .map(ImageReference::from)
                .collect()
        };

        if image_refs.is_empty() {
            return Err(SyncError::NoImagesFound(source.to_string()));
        }

        let mut plan = SyncPlan::new();
        plan.push(RepoDescriptor::new(image_refs, base.clone()));
        Ok(plan)
    }

    fn resolve_directory(&self, source: &str, base: &ConnectionContext) -> Result<SyncPlan> {
        let invalid = |e| SyncError::InvalidSource {
            path: source.into(),
            source: e,
        };

        std::fs::metadata(source).map_err(invalid)?;
        let base_path = std::path::absolute(Path::new(source)).map_err(invalid)?;

        let image_refs = find_image_directories(&base_path)?
            .into_iter()
            .map(|dir| DirectoryReference::new(dir).map(ImageReference::from))
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(invalid)?;

        if image_refs.is_empty() {
            return Err(SyncError::NoImagesFound(source.to_string()));
        }
        info!(count = image_refs.len(), path = %base_path.display(), "Found image directories");

        let mut plan = SyncPlan::new();
        plan.push(RepoDescriptor::from_directory(
            image_refs,
            base.clone(),
            base_path,
        ));
        Ok(plan)
    }

    async fn resolve_config(&self, source: &str, base: &ConnectionContext) -> Result<SyncPlan> {
        let config = load_source_config(source)?;
        let expander = RegistryExpander::new(self.tag_lister, self.progress);

        let mut plan = SyncPlan::new();
        for (registry_name, entry) in &config.registries {
            if entry.has_no_images() {
                self.progress.report(SyncEvent::RegistrySkipped {
                    registry: registry_name.clone(),
                });
                continue;
            }
            plan.extend(expander.expand(registry_name, entry, base).await);
        }
        Ok(plan)
    }
}
