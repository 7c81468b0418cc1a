//! Destination naming and destination reference construction.

use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, SyncError};
use crate::plan::RepoDescriptor;
use crate::reference::{DirectoryReference, ImageReference, RegistryReference};
use crate::transport::DestinationTransport;

/// Computes the part of the destination name derived from `source`.
///
/// Scoped names keep the full source path. Unscoped names keep only the last
/// path component, so images with the same name and tag from different
/// repositories land on the same destination.
pub fn destination_suffix(
    source: &ImageReference,
    descriptor: &RepoDescriptor,
    scoped: bool,
) -> String {
    let suffix = match source {
        ImageReference::Registry(r) => r.to_string(),
        ImageReference::Directory(d) => directory_suffix(d, descriptor.dir_base_path()),
    };

    if scoped {
        suffix
    } else {
        last_component(&suffix).to_string()
    }
}

fn directory_suffix(image: &DirectoryReference, base: Option<&Path>) -> String {
    let Some(base) = base else {
        return image.path().to_string_lossy().into_owned();
    };

    match image.path().strip_prefix(base) {
        Ok(rel) if rel.as_os_str().is_empty() => base
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) => image.path().to_string_lossy().into_owned(),
    }
}

fn last_component(suffix: &str) -> &str {
    let trimmed = suffix.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Joins `root` and `suffix` with exactly one separator.
pub fn join_destination(root: &str, suffix: &str) -> String {
    let suffix = suffix.trim_start_matches('/');
    if root.is_empty() {
        return suffix.to_string();
    }
    if suffix.is_empty() {
        return root.to_string();
    }
    format!("{}/{}", root.trim_end_matches('/'), suffix)
}

/// Builds the destination reference for `location`.
///
/// Directory destinations must not exist yet; the directory (and its
/// parents) is created here.
pub fn destination_reference(
    location: &str,
    transport: DestinationTransport,
) -> Result<ImageReference> {
    debug!(transport = %transport, destination = %location, "Destination for transport");

    match transport {
        DestinationTransport::Docker => {
            Ok(RegistryReference::parse_normalized(location)?.into())
        }
        DestinationTransport::Dir => {
            let path = Path::new(location);
            match std::fs::metadata(path) {
                Ok(_) => return Err(SyncError::DestinationExists(path.to_path_buf())),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(SyncError::DestinationUnusable {
                        path: path.to_path_buf(),
                        source: e,
                    })
                }
            }

            std::fs::create_dir_all(path).map_err(|e| SyncError::CreateDestination {
                path: path.to_path_buf(),
                source: e,
            })?;

            DirectoryReference::new(path)
                .map(ImageReference::from)
                .map_err(|e| SyncError::DestinationUnusable {
                    path: path.to_path_buf(),
                    source: e,
                })
        }
    }
}
