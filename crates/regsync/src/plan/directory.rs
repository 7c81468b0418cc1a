//! Discovery of exported image directories.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, SyncError};
use crate::reference::MANIFEST_FILE;

/// Finds every directory under `root` (inclusive) that holds an image.
///
/// A directory with a manifest at its own level is an image and its subtree
/// is not searched further. Entries are visited in file name order.
pub fn find_image_directories(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut walker = WalkDir::new(root).sort_by_file_name().into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|e| SyncError::WalkDirectory {
            path: root.to_path_buf(),
            source: e,
        })?;

        if !entry.file_type().is_dir() {
            continue;
        }

        if entry.path().join(MANIFEST_FILE).is_file() {
            found.push(entry.path().to_path_buf());
            walker.skip_current_dir();
        }
    }

    Ok(found)
}
