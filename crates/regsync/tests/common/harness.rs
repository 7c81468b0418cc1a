//! Test harness for isolated sync runs.
//!
//! The `TestHarness` owns a temporary directory with `source/`, `dest/` and
//! `config/` subdirectories, plus the fake collaborators wired into a
//! `SyncExecutor`.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use regsync::progress::RecordingProgress;
use regsync::reference::MANIFEST_FILE;
use regsync::{SyncExecutor, SyncOptions, SyncPlan, SyncSummary};

use super::builders::{FakeTagLister, FakeTransfer};

pub struct TestHarness {
    temp_dir: TempDir,
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub config_dir: PathBuf,
    pub tags: Arc<FakeTagLister>,
    pub transfer: Arc<FakeTransfer>,
    pub progress: Arc<RecordingProgress>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_collaborators(FakeTagLister::new(), FakeTransfer::new())
    }

    pub fn with_collaborators(tags: FakeTagLister, transfer: FakeTransfer) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let source_dir = base.join("source");
        let dest_dir = base.join("dest");
        let config_dir = base.join("config");

        fs::create_dir_all(&source_dir).expect("Failed to create source directory");
        fs::create_dir_all(&dest_dir).expect("Failed to create dest directory");
        fs::create_dir_all(&config_dir).expect("Failed to create config directory");

        Self {
            temp_dir,
            source_dir,
            dest_dir,
            config_dir,
            tags: Arc::new(tags),
            transfer: Arc::new(transfer),
            progress: Arc::new(RecordingProgress::new()),
        }
    }

    pub fn base_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn executor(&self) -> SyncExecutor {
        SyncExecutor::new(self.tags.clone(), self.transfer.clone(), self.progress.clone())
    }

    /// Writes a declarative source config and returns its path.
    pub fn write_config(&self, name: &str, yaml: &str) -> PathBuf {
        let path = self.config_dir.join(name);
        fs::write(&path, yaml).expect("Failed to write config");
        path
    }

    /// Creates an exported image directory at `rel` under the source dir.
    pub fn create_image_dir(&self, rel: &str) -> PathBuf {
        let dir = self.source_dir.join(rel);
        fs::create_dir_all(&dir).expect("Failed to create image directory");
        fs::write(dir.join(MANIFEST_FILE), r#"{"schemaVersion":2}"#)
            .expect("Failed to write manifest");
        dir
    }

    pub fn dest_str(&self) -> String {
        self.dest_dir.to_string_lossy().into_owned()
    }

    pub async fn plan(&self, source: &str, options: &SyncOptions) -> regsync::Result<SyncPlan> {
        self.executor()
            .plan(source, options, &CancellationToken::new())
            .await
    }

    pub async fn run(
        &self,
        source: &str,
        destination: &str,
        options: &SyncOptions,
    ) -> regsync::Result<SyncSummary> {
        self.executor()
            .run(source, destination, options, &CancellationToken::new())
            .await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
