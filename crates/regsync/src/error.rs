use std::path::PathBuf;
use thiserror::Error;

use crate::registry::RegistryError;
use crate::retry::{Cancelled, Retryable};
use crate::transfer::TransferError;
use crate::transport::TransportRole;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("\"{transport}\" is not a valid {role} transport")]
    InvalidTransport {
        transport: String,
        role: TransportRole,
    },

    #[error("Invalid source directory specified '{path}': {source}")]
    InvalidSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No images to sync found in \"{0}\"")]
    NoImagesFound(String),

    #[error("sync from 'dir' to 'dir' not implemented, consider using rsync instead")]
    UnsupportedCombination,

    #[error("Refusing to overwrite destination directory '{0}'")]
    DestinationExists(PathBuf),

    #[error("Destination directory '{path}' could not be used: {source}")]
    DestinationUnusable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error creating directory for image '{path}': {source}")]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error walking the path '{path}': {source}")]
    WalkDirectory {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Error determining repository tags for image {repository}: {source}")]
    TagListing {
        repository: String,
        #[source]
        source: RegistryError,
    },

    #[error("Error copying ref \"{reference}\": {source}")]
    Transfer {
        reference: String,
        #[source]
        source: TransferError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid image reference: {0}")]
    Reference(#[from] ReferenceError),

    #[error("Sync cancelled")]
    Cancelled,
}

impl Retryable for SyncError {
    fn is_retryable(&self) -> bool {
        match self {
            SyncError::TagListing { source, .. } => source.is_retryable(),
            SyncError::Transfer { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<Cancelled> for SyncError {
    fn from(_: Cancelled) -> Self {
        SyncError::Cancelled
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to unmarshal \"{path}\": {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid manifest format \"{0}\" (expected one of: oci, v2s1, v2s2)")]
    InvalidManifestFormat(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("invalid reference format: \"{0}\"")]
    InvalidFormat(String),

    #[error("invalid reference format: repository name must be lowercase: \"{0}\"")]
    Uppercase(String),

    #[error("repository name must not be more than 255 characters: \"{0}\"")]
    NameTooLong(String),

    #[error("invalid repository name \"{0}\", cannot specify 64-byte hexadecimal strings")]
    HexadecimalName(String),

    #[error("invalid tag format: \"{0}\"")]
    InvalidTag(String),

    #[error("invalid digest format: \"{0}\"")]
    InvalidDigest(String),

    #[error("unsupported digest algorithm: \"{0}\"")]
    UnsupportedAlgorithm(String),

    #[error("input names a reference, not a repository: \"{0}\"")]
    NotARepository(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
