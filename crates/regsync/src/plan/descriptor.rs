use std::path::{Path, PathBuf};

use crate::context::ConnectionContext;
use crate::reference::ImageReference;

/// A group of images that share one connection context.
#[derive(Debug, Clone)]
pub struct RepoDescriptor {
    pub image_refs: Vec<ImageReference>,
    pub context: ConnectionContext,
    /// Root of the walk, set only for directory sources.
    pub dir_base_path: Option<PathBuf>,
}

impl RepoDescriptor {
    pub fn new(image_refs: Vec<ImageReference>, context: ConnectionContext) -> Self {
        Self {
            image_refs,
            context,
            dir_base_path: None,
        }
    }

    pub fn from_directory(
        image_refs: Vec<ImageReference>,
        context: ConnectionContext,
        base_path: PathBuf,
    ) -> Self {
        Self {
            image_refs,
            context,
            dir_base_path: Some(base_path),
        }
    }

    pub fn dir_base_path(&self) -> Option<&Path> {
        self.dir_base_path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.image_refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image_refs.is_empty()
    }
}

/// The ordered output of planning, consumed once by the executor.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    descriptors: Vec<RepoDescriptor>,
}

impl SyncPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a descriptor. Empty descriptors are dropped; returns whether
    /// `descriptor` was added.
    pub fn push(&mut self, descriptor: RepoDescriptor) -> bool {
        if descriptor.is_empty() {
            return false;
        }
        self.descriptors.push(descriptor);
        true
    }

    pub fn extend(&mut self, descriptors: impl IntoIterator<Item = RepoDescriptor>) {
        for descriptor in descriptors {
            self.push(descriptor);
        }
    }

    pub fn descriptors(&self) -> &[RepoDescriptor] {
        &self.descriptors
    }

    /// Number of descriptors ("sources").
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Total number of image references across all descriptors.
    pub fn image_count(&self) -> usize {
        self.descriptors.iter().map(RepoDescriptor::len).sum()
    }

    /// Every reference in execution order.
    pub fn image_refs(&self) -> impl Iterator<Item = &ImageReference> {
        self.descriptors.iter().flat_map(|d| d.image_refs.iter())
    }
}

impl IntoIterator for SyncPlan {
    type Item = RepoDescriptor;
    type IntoIter = std::vec::IntoIter<RepoDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.into_iter()
    }
}
