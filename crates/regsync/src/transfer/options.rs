use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A manifest type to force at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Oci,
    V2s1,
    V2s2,
}

impl ManifestFormat {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        match input {
            "oci" => Ok(ManifestFormat::Oci),
            "v2s1" => Ok(ManifestFormat::V2s1),
            "v2s2" => Ok(ManifestFormat::V2s2),
            other => Err(ConfigError::InvalidManifestFormat(other.to_string())),
        }
    }

    /// Short name accepted on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            ManifestFormat::Oci => "oci",
            ManifestFormat::V2s1 => "v2s1",
            ManifestFormat::V2s2 => "v2s2",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ManifestFormat::Oci => "application/vnd.oci.image.manifest.v1+json",
            ManifestFormat::V2s1 => "application/vnd.docker.distribution.manifest.v1+prettyjws",
            ManifestFormat::V2s2 => "application/vnd.docker.distribution.manifest.v2+json",
        }
    }
}

impl FromStr for ManifestFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which images of a manifest list get copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageListSelection {
    /// Only the image matching the current platform.
    #[default]
    System,
    /// Every image in the list.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOptions {
    pub remove_signatures: bool,
    /// Key fingerprint to sign the copied images with.
    pub sign_by: Option<String>,
    pub manifest_format: Option<ManifestFormat>,
    pub image_list_selection: ImageListSelection,
    /// Skip blobs already present at the destination.
    ///
    /// A hint for in-process [`ImageTransfer`](super::ImageTransfer)
    /// implementations. [`CommandTransfer`](super::CommandTransfer) has no flag
    /// for it because the copy tool always checks the destination first.
    pub optimize_destination_image_already_exists: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            remove_signatures: false,
            sign_by: None,
            manifest_format: None,
            image_list_selection: ImageListSelection::System,
            optimize_destination_image_already_exists: true,
        }
    }
}
