//! Addressable image handles for both sides of a sync.

pub mod digest;
pub mod name;

use std::fmt;
use std::path::{Path, PathBuf};

pub use digest::Digest;
pub use name::{RegistryReference, DEFAULT_DOMAIN};

/// Path of the file that marks a directory as holding one exported image.
pub const MANIFEST_FILE: &str = "manifest.json";

/// A directory holding one image's manifest and blobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectoryReference {
    path: PathBuf,
}

impl DirectoryReference {
    /// Builds a reference from an image directory, made absolute against the
    /// current working directory when relative.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self {
            path: std::path::absolute(path.as_ref())?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An image on either side of a sync. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageReference {
    Registry(RegistryReference),
    Directory(DirectoryReference),
}

impl ImageReference {
    pub fn as_registry(&self) -> Option<&RegistryReference> {
        match self {
            ImageReference::Registry(r) => Some(r),
            ImageReference::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&DirectoryReference> {
        match self {
            ImageReference::Registry(_) => None,
            ImageReference::Directory(d) => Some(d),
        }
    }
}

impl From<RegistryReference> for ImageReference {
    fn from(r: RegistryReference) -> Self {
        ImageReference::Registry(r)
    }
}

impl From<DirectoryReference> for ImageReference {
    fn from(d: DirectoryReference) -> Self {
        ImageReference::Directory(d)
    }
}

/// Transport-qualified form, e.g. `docker://quay.io/foo:1` or `dir:/srv/images/foo`.
impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageReference::Registry(r) => write!(f, "docker://{}", r),
            ImageReference::Directory(d) => write!(f, "dir:{}", d.path.display()),
        }
    }
}
