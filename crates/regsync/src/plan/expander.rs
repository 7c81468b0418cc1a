//! Expansion of one registry entry of a declarative source config.

use regex::Regex;
use tracing::{debug, info_span, Instrument};

use super::descriptor::RepoDescriptor;
use super::list_repository_tags;
use crate::config::RegistrySyncEntry;
use crate::context::ConnectionContext;
use crate::progress::{ProgressReporter, SkipReason, SyncEvent};
use crate::reference::{Digest, ImageReference, RegistryReference};
use crate::registry::TagLister;

/// Expands a registry entry into repository descriptors.
///
/// Problems with one repository are reported and that repository is
/// skipped; expansion itself never fails.
pub struct RegistryExpander<'a> {
    tag_lister: &'a dyn TagLister,
    progress: &'a dyn ProgressReporter,
}

impl<'a> RegistryExpander<'a> {
    pub fn new(tag_lister: &'a dyn TagLister, progress: &'a dyn ProgressReporter) -> Self {
        Self {
            tag_lister,
            progress,
        }
    }

    pub async fn expand(
        &self,
        registry_name: &str,
        entry: &RegistrySyncEntry,
        base: &ConnectionContext,
    ) -> Vec<RepoDescriptor> {
        let ctx = base.for_registry(entry);
        let mut descriptors = Vec::new();

        for (repo_name, refs) in &entry.images {
            let span = info_span!("repo", registry = %registry_name, repo = %repo_name);
            if let Some(descriptor) = self
                .expand_images(registry_name, repo_name, refs, &ctx)
                .instrument(span)
                .await
            {
                descriptors.push(descriptor);
            }
        }

        for (repo_name, tag_regex) in &entry.images_by_tag_regex {
            let span = info_span!("repo", registry = %registry_name, repo = %repo_name);
            if let Some(descriptor) = self
                .expand_tag_regex(registry_name, repo_name, tag_regex, &ctx)
                .instrument(span)
                .await
            {
                descriptors.push(descriptor);
            }
        }

        descriptors
    }

    async fn expand_images(
        &self,
        registry_name: &str,
        repo_name: &str,
        refs: &[String],
        ctx: &ConnectionContext,
    ) -> Option<RepoDescriptor> {
        let repository = self.parse_repository(registry_name, repo_name)?;

        let image_refs: Vec<ImageReference> = if refs.is_empty() {
            match list_repository_tags(self.tag_lister, ctx, &repository, self.progress).await {
                Ok(tagged) => tagged.into_iter().map(ImageReference::from).collect(),
                Err(e) => {
                    self.skip(
                        registry_name,
                        repo_name,
                        SkipReason::TagListingFailed(e.to_string()),
                    );
                    return None;
                }
            }
        } else {
            refs.iter()
                .filter_map(|r| {
                    self.parse_ref(&repository, r)
                        .map_err(|reason| {
                            self.progress.report(SyncEvent::RefSkipped {
                                registry: registry_name.to_string(),
                                repository: repo_name.to_string(),
                                reference: r.clone(),
                                reason,
                            })
                        })
                        .ok()
                })
                .map(ImageReference::from)
                .collect()
        };

        self.finish(registry_name, repo_name, &repository, image_refs, ctx)
    }

    async fn expand_tag_regex(
        &self,
        registry_name: &str,
        repo_name: &str,
        tag_regex: &str,
        ctx: &ConnectionContext,
    ) -> Option<RepoDescriptor> {
        let repository = self.parse_repository(registry_name, repo_name)?;

        let regex = match Regex::new(tag_regex) {
            Ok(regex) => regex,
            Err(e) => {
                self.skip(
                    registry_name,
                    repo_name,
                    SkipReason::InvalidRegex(e.to_string()),
                );
                return None;
            }
        };

        let tagged =
            match list_repository_tags(self.tag_lister, ctx, &repository, self.progress).await {
                Ok(tagged) => tagged,
                Err(e) => {
                    self.skip(
                        registry_name,
                        repo_name,
                        SkipReason::TagListingFailed(e.to_string()),
                    );
                    return None;
                }
            };

        self.progress.report(SyncEvent::FilteringTags {
            repository: repository.name(),
            regex: tag_regex.to_string(),
        });

        let image_refs: Vec<ImageReference> = tagged
            .into_iter()
            .filter(|r| r.tag().is_some_and(|tag| regex.is_match(tag)))
            .map(ImageReference::from)
            .collect();

        self.finish(registry_name, repo_name, &repository, image_refs, ctx)
    }

    fn parse_repository(&self, registry_name: &str, repo_name: &str) -> Option<RegistryReference> {
        match RegistryReference::parse_repository(&format!("{}/{}", registry_name, repo_name)) {
            Ok(repository) => Some(repository),
            Err(e) => {
                self.skip(
                    registry_name,
                    repo_name,
                    SkipReason::InvalidName(e.to_string()),
                );
                None
            }
        }
    }

    /// A ref is a digest when it parses as one, a tag otherwise.
    fn parse_ref(
        &self,
        repository: &RegistryReference,
        raw: &str,
    ) -> Result<RegistryReference, String> {
        if let Ok(digest) = Digest::parse(raw) {
            return Ok(repository.with_digest(digest));
        }
        repository.with_tag(raw).map_err(|e| e.to_string())
    }

    fn finish(
        &self,
        registry_name: &str,
        repo_name: &str,
        repository: &RegistryReference,
        image_refs: Vec<ImageReference>,
        ctx: &ConnectionContext,
    ) -> Option<RepoDescriptor> {
        if image_refs.is_empty() {
            self.skip(registry_name, repo_name, SkipReason::NoRefsFound);
            return None;
        }

        debug!(count = image_refs.len(), "Repository expanded");
        self.progress.report(SyncEvent::RepositoryPlanned {
            repository: repository.name(),
            images: image_refs.len(),
        });
        Some(RepoDescriptor::new(image_refs, ctx.clone()))
    }

    fn skip(&self, registry_name: &str, repo_name: &str, reason: SkipReason) {
        self.progress.report(SyncEvent::RepositorySkipped {
            registry: registry_name.to_string(),
            repository: repo_name.to_string(),
            reason,
        });
    }
}
