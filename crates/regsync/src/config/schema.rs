use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::context::OptionalBool;

/// Declarative multi-registry source, keyed by registry host[/namespace].
///
/// Registries are held in a sorted map so planning order is reproducible.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SourceConfig {
    pub registries: BTreeMap<String, RegistrySyncEntry>,
}

impl SourceConfig {
    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }
}

/// Sync settings for a single registry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrySyncEntry {
    /// Repository name to tags and digests. An empty list means every tag.
    #[serde(default, deserialize_with = "deserialize_ref_lists")]
    pub images: BTreeMap<String, Vec<String>>,

    /// Repository name to a regular expression matched against its tags.
    #[serde(default, rename = "images-by-tag-regex")]
    pub images_by_tag_regex: BTreeMap<String, String>,

    #[serde(default)]
    pub credentials: Credentials,

    /// Raw `tls-verify` value; see [`RegistrySyncEntry::tls_skip_verify`].
    #[serde(default, rename = "tls-verify")]
    pub tls_verify: Option<bool>,

    #[serde(default, rename = "cert-dir")]
    pub cert_dir: Option<PathBuf>,
}

impl RegistrySyncEntry {
    /// True when the entry names nothing to sync.
    pub fn has_no_images(&self) -> bool {
        self.images.is_empty() && self.images_by_tag_regex.is_empty()
    }

    /// The skip-verify setting derived from the `tls-verify` key.
    pub fn tls_skip_verify(&self) -> OptionalBool {
        self.tls_verify.map(parse_verify_flag).unwrap_or_default()
    }
}

/// Converts a `tls-verify` value into the internal skip-verify flag.
///
/// The YAML key means "require TLS verification"; internally the flag means
/// "skip verification", so the value is inverted.
pub fn parse_verify_flag(raw: bool) -> OptionalBool {
    OptionalBool::new(!raw)
}

/// Username and password for a registry.
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// True when neither a username nor a password is set.
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.expose_secret().is_empty()
    }

    /// Parses `USERNAME[:PASSWORD]` as given on the command line.
    pub fn parse(input: &str) -> Option<Self> {
        if input.is_empty() {
            return None;
        }
        match input.split_once(':') {
            Some((user, password)) if !user.is_empty() => Some(Self::new(user, password)),
            Some(_) => None,
            None => Some(Self::new(input, "")),
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(String::new(), String::new())
    }
}

impl Clone for Credentials {
    fn clone(&self) -> Self {
        Self {
            username: self.username.clone(),
            password: SecretString::from(self.password.expose_secret().to_string()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl<'de> Deserialize<'de> for Credentials {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Raw {
            #[serde(default)]
            username: String,
            #[serde(default)]
            password: String,
        }

        let raw = Raw::deserialize(deserializer)?;
        Ok(Credentials::new(raw.username, raw.password))
    }
}

/// Accepts `repo:` (null) as well as `repo: []` for "all tags".
fn deserialize_ref_lists<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, Option<Vec<String>>> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(repo, refs)| (repo, refs.unwrap_or_default()))
        .collect())
}
