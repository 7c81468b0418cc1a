pub mod config;
pub mod context;
pub mod destination;
pub mod error;
pub mod executor;
pub mod plan;
pub mod progress;
pub mod reference;
pub mod registry;
pub mod retry;
pub mod sanitize;
pub mod transfer;
pub mod transport;

pub use config::{load_source_config, Credentials, RegistrySyncEntry, SourceConfig};
pub use context::{ConnectionContext, OptionalBool, RegistryToken};
pub use error::{ConfigError, ReferenceError, Result, SyncError};
pub use executor::{SyncExecutor, SyncOptions, SyncSummary};
pub use plan::{RepoDescriptor, SyncPlan};
pub use progress::{LogProgress, ProgressReporter, SyncEvent};
pub use reference::{DirectoryReference, ImageReference, RegistryReference};
pub use registry::{HttpTagLister, RegistryError, TagLister};
pub use retry::RetryPolicy;
pub use transfer::{CommandTransfer, ImageTransfer, ManifestFormat, TransferError, TransferOptions};
pub use transport::{DestinationTransport, SourceTransport};
