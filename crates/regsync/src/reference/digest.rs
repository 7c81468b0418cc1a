use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ReferenceError;

static RE_DIGEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9]+(?:[.+_-][a-z0-9]+)*):([a-zA-Z0-9=_-]+)$").unwrap()
});

/// A content-addressed image identifier, `algorithm:hex`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: String,
    encoded: String,
}

impl Digest {
    /// Parses and validates a digest string.
    ///
    /// `sha256` and `sha512` are checked for exact length and lowercase hex.
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        let caps = RE_DIGEST
            .captures(input)
            .ok_or_else(|| ReferenceError::InvalidDigest(input.to_string()))?;
        let algorithm = &caps[1];
        let encoded = &caps[2];

        let expected_len = match algorithm {
            "sha256" => 64,
            "sha384" => 96,
            "sha512" => 128,
            _ => return Err(ReferenceError::UnsupportedAlgorithm(algorithm.to_string())),
        };
        let is_lower_hex = encoded
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if encoded.len() != expected_len || !is_lower_hex {
            return Err(ReferenceError::InvalidDigest(input.to_string()));
        }

        Ok(Self {
            algorithm: algorithm.to_string(),
            encoded: encoded.to_string(),
        })
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.encoded)
    }
}
