//! Transport names accepted on each side of a sync.

use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

/// Which side of the sync a transport name was given for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportRole {
    Source,
    Destination,
}

impl fmt::Display for TransportRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportRole::Source => write!(f, "source"),
            TransportRole::Destination => write!(f, "destination"),
        }
    }
}

/// Where images are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTransport {
    /// A single registry repository, optionally tagged.
    Docker,
    /// A directory tree of previously exported images.
    Dir,
    /// A declarative multi-registry YAML file.
    Yaml,
}

/// Where images are written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationTransport {
    Docker,
    Dir,
}

impl SourceTransport {
    pub fn name(&self) -> &'static str {
        match self {
            SourceTransport::Docker => "docker",
            SourceTransport::Dir => "dir",
            SourceTransport::Yaml => "yaml",
        }
    }
}

impl DestinationTransport {
    pub fn name(&self) -> &'static str {
        match self {
            DestinationTransport::Docker => "docker",
            DestinationTransport::Dir => "dir",
        }
    }
}

impl fmt::Display for SourceTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for DestinationTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceTransport {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "docker" | "registry" => Ok(SourceTransport::Docker),
            "dir" | "directory" => Ok(SourceTransport::Dir),
            "yaml" => Ok(SourceTransport::Yaml),
            _ => Err(SyncError::InvalidTransport {
                transport: s.to_string(),
                role: TransportRole::Source,
            }),
        }
    }
}

impl FromStr for DestinationTransport {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "docker" | "registry" => Ok(DestinationTransport::Docker),
            "dir" | "directory" => Ok(DestinationTransport::Dir),
            _ => Err(SyncError::InvalidTransport {
                transport: s.to_string(),
                role: TransportRole::Destination,
            }),
        }
    }
}

/// Rejects transport pairs that sync does not handle.
///
/// Directory to directory copies are left to filesystem tools.
pub fn validate_combination(
    source: SourceTransport,
    destination: DestinationTransport,
) -> Result<(), SyncError> {
    if source == SourceTransport::Dir && destination == DestinationTransport::Dir {
        return Err(SyncError::UnsupportedCombination);
    }
    Ok(())
}
