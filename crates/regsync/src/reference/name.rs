use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::digest::Digest;
use crate::error::ReferenceError;

/// Registry assumed for names without an explicit domain.
pub const DEFAULT_DOMAIN: &str = "docker.io";
const LEGACY_DEFAULT_DOMAIN: &str = "index.docker.io";
const OFFICIAL_REPO_PREFIX: &str = "library/";
const NAME_TOTAL_LENGTH_MAX: usize = 255;

static RE_PATH_COMPONENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*$").unwrap());
static RE_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?)(?:\.(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?))*(?::[0-9]+)?$",
    )
    .unwrap()
});
static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w][\w.-]{0,127}$").unwrap());
static RE_ANCHORED_HEX64: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-f0-9]{64}$").unwrap());

/// A fully-qualified registry reference: `domain/path[:tag][@digest]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryReference {
    domain: String,
    path: String,
    tag: Option<String>,
    digest: Option<Digest>,
}

impl RegistryReference {
    /// Parses a possibly-short name into a fully-qualified reference.
    ///
    /// `busybox` becomes `docker.io/library/busybox`; a first component that
    /// contains `.` or `:`, is `localhost`, or has uppercase letters is taken
    /// as the registry domain.
    pub fn parse_normalized(input: &str) -> Result<Self, ReferenceError> {
        if RE_ANCHORED_HEX64.is_match(input) {
            return Err(ReferenceError::HexadecimalName(input.to_string()));
        }

        let (domain, remainder) = split_domain(input);

        let (name_and_tag, digest) = match remainder.split_once('@') {
            Some((name, digest)) => (name, Some(Digest::parse(digest)?)),
            None => (remainder.as_str(), None),
        };

        let (path, tag) = match name_and_tag.rfind(':') {
            Some(idx) if !name_and_tag[idx..].contains('/') => {
                (&name_and_tag[..idx], Some(&name_and_tag[idx + 1..]))
            }
            _ => (name_and_tag, None),
        };

        if path.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(ReferenceError::Uppercase(input.to_string()));
        }
        if path.is_empty() || !path.split('/').all(|c| RE_PATH_COMPONENT.is_match(c)) {
            return Err(ReferenceError::InvalidFormat(input.to_string()));
        }
        if !RE_DOMAIN.is_match(&domain) {
            return Err(ReferenceError::InvalidFormat(input.to_string()));
        }
        if domain.len() + 1 + path.len() > NAME_TOTAL_LENGTH_MAX {
            return Err(ReferenceError::NameTooLong(input.to_string()));
        }
        if let Some(tag) = tag {
            validate_tag(tag)?;
        }

        Ok(Self {
            domain,
            path: path.to_string(),
            tag: tag.map(str::to_string),
            digest,
        })
    }

    /// Parses `input` and verifies it names a repository, not an image.
    pub fn parse_repository(input: &str) -> Result<Self, ReferenceError> {
        let parsed = Self::parse_normalized(input)?;
        if !parsed.is_name_only() {
            return Err(ReferenceError::NotARepository(input.to_string()));
        }
        Ok(parsed)
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Repository path within the registry, e.g. `library/busybox`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `domain/path`, without tag or digest.
    pub fn name(&self) -> String {
        format!("{}/{}", self.domain, self.path)
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }

    pub fn is_name_only(&self) -> bool {
        self.tag.is_none() && self.digest.is_none()
    }

    /// The bare repository this reference belongs to.
    pub fn repository(&self) -> Self {
        Self {
            domain: self.domain.clone(),
            path: self.path.clone(),
            tag: None,
            digest: None,
        }
    }

    pub fn with_tag(&self, tag: &str) -> Result<Self, ReferenceError> {
        validate_tag(tag)?;
        Ok(Self {
            tag: Some(tag.to_string()),
            ..self.repository()
        })
    }

    pub fn with_digest(&self, digest: Digest) -> Self {
        Self {
            digest: Some(digest),
            ..self.repository()
        }
    }
}

impl fmt::Display for RegistryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.path)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

fn validate_tag(tag: &str) -> Result<(), ReferenceError> {
    if RE_TAG.is_match(tag) {
        Ok(())
    } else {
        Err(ReferenceError::InvalidTag(tag.to_string()))
    }
}

fn split_domain(input: &str) -> (String, String) {
    let (mut domain, mut remainder) = match input.split_once('/') {
        Some((first, rest))
            if first.contains(['.', ':'])
                || first == "localhost"
                || first.chars().any(|c| c.is_ascii_uppercase()) =>
        {
            (first.to_string(), rest.to_string())
        }
        _ => (DEFAULT_DOMAIN.to_string(), input.to_string()),
    };

    if domain == LEGACY_DEFAULT_DOMAIN {
        domain = DEFAULT_DOMAIN.to_string();
    }
    if domain == DEFAULT_DOMAIN && !remainder.contains('/') {
        remainder = format!("{}{}", OFFICIAL_REPO_PREFIX, remainder);
    }
    (domain, remainder)
}
