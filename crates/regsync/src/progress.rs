use std::fmt;
use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Why a repository contributed nothing to the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    InvalidName(String),
    InvalidRegex(String),
    TagListingFailed(String),
    NoRefsFound,
}

impl SkipReason {
    /// Empty repositories are expected; everything else is a broken entry.
    pub fn is_error(&self) -> bool {
        !matches!(self, SkipReason::NoRefsFound)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidName(e) => write!(f, "error parsing repository name: {}", e),
            SkipReason::InvalidRegex(e) => write!(f, "error parsing regex: {}", e),
            SkipReason::TagListingFailed(e) => write!(f, "error processing repo: {}", e),
            SkipReason::NoRefsFound => write!(f, "no refs to sync found"),
        }
    }
}

/// Events emitted while planning and executing a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    TagPresenceChecked {
        image: String,
        tagged: bool,
    },
    ListingTags {
        repository: String,
    },
    /// The registry refused to list tags; treated as zero tags.
    TagListingDenied {
        repository: String,
        reason: String,
    },
    RegistrySkipped {
        registry: String,
    },
    RepositorySkipped {
        registry: String,
        repository: String,
        reason: SkipReason,
    },
    RefSkipped {
        registry: String,
        repository: String,
        reference: String,
        reason: String,
    },
    FilteringTags {
        repository: String,
        regex: String,
    },
    RepositoryPlanned {
        repository: String,
        images: usize,
    },
    Copying {
        index: usize,
        total: usize,
        from: String,
        to: String,
    },
    Finished {
        images: usize,
        sources: usize,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: SyncEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: SyncEvent) {}
}

/// Forwards events to `tracing` with structured fields.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, event: SyncEvent) {
        match event {
            SyncEvent::TagPresenceChecked { image, tagged } => {
                info!(imagename = %image, tagged, "Tag presence check");
            }
            SyncEvent::ListingTags { repository } => {
                info!(image = %repository, "Getting tags");
            }
            SyncEvent::TagListingDenied { repository, reason } => {
                warn!(image = %repository, "Registry disallows tag list retrieval: {}", reason);
            }
            SyncEvent::RegistrySkipped { registry } => {
                warn!(registry = %registry, "No images specified for registry");
            }
            SyncEvent::RepositorySkipped {
                registry,
                repository,
                reason,
            } => {
                if reason.is_error() {
                    error!(registry = %registry, repo = %repository, "Skipping repo: {}", reason);
                } else {
                    warn!(registry = %registry, repo = %repository, "No refs to sync found");
                }
            }
            SyncEvent::RefSkipped {
                registry,
                repository,
                reference,
                reason,
            } => {
                error!(
                    registry = %registry,
                    repo = %repository,
                    reference = %reference,
                    "Error processing ref, skipping: {}",
                    reason
                );
            }
            SyncEvent::FilteringTags { repository, regex } => {
                info!(repo = %repository, "Start filtering using the regular expression: {}", regex);
            }
            SyncEvent::RepositoryPlanned { repository, images } => {
                debug!(repo = %repository, images, "Repository planned");
            }
            SyncEvent::Copying {
                index,
                total,
                from,
                to,
            } => {
                info!(from = %from, to = %to, "Copying image ref {}/{}", index, total);
            }
            SyncEvent::Finished { images, sources } => {
                info!("Synced {} images from {} sources", images, sources);
            }
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn count(&self, predicate: impl Fn(&SyncEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: SyncEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}
