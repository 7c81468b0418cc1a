//! Connection settings shared by every reference in one repository group.

use std::fmt;
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};

use crate::config::{Credentials, RegistrySyncEntry};

/// A boolean that can also be left unset, so callers can tell "not
/// specified" apart from an explicit `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionalBool {
    #[default]
    Unset,
    True,
    False,
}

impl OptionalBool {
    pub fn new(value: bool) -> Self {
        if value {
            OptionalBool::True
        } else {
            OptionalBool::False
        }
    }

    /// The explicit value, or `default` when unset.
    pub fn unwrap_or(self, default: bool) -> bool {
        match self {
            OptionalBool::Unset => default,
            OptionalBool::True => true,
            OptionalBool::False => false,
        }
    }

    pub fn is_true(self) -> bool {
        self == OptionalBool::True
    }
}

impl From<Option<bool>> for OptionalBool {
    fn from(value: Option<bool>) -> Self {
        value.map(OptionalBool::new).unwrap_or_default()
    }
}

/// A pre-issued registry bearer token.
pub struct RegistryToken(SecretString);

impl RegistryToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for RegistryToken {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for RegistryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RegistryToken([REDACTED])")
    }
}

/// Connection, authentication and TLS settings for one side of a transfer.
///
/// Each repository group owns its own copy; contexts are never mutated once
/// handed to a descriptor.
#[derive(Debug, Clone, Default)]
pub struct ConnectionContext {
    /// Directory with `*.crt` (extra roots) used for registry connections.
    pub cert_dir: Option<PathBuf>,
    /// Certificate directory used when talking to a container daemon.
    ///
    /// Kept in step with `cert_dir` for [`ImageTransfer`](crate::transfer::ImageTransfer)
    /// implementations that reach images through a daemon. Neither registry nor
    /// directory transports read it, and [`CommandTransfer`](crate::transfer::CommandTransfer)
    /// ignores it.
    pub daemon_cert_dir: Option<PathBuf>,
    /// Skip TLS verification for registry connections. Unset means verify.
    pub insecure_skip_tls_verify: OptionalBool,
    /// Daemon counterpart of `insecure_skip_tls_verify`; see `daemon_cert_dir`.
    pub daemon_insecure_skip_tls_verify: bool,
    pub credentials: Option<Credentials>,
    pub registry_token: Option<RegistryToken>,
    /// Connect anonymously even when credentials are available.
    pub no_credentials: bool,
}

impl ConnectionContext {
    /// Derives the context used for one registry of a declarative config.
    ///
    /// Certificate directory and both skip-verify flags always come from the
    /// entry; credentials are replaced only when the entry sets them.
    pub fn for_registry(&self, entry: &RegistrySyncEntry) -> Self {
        let skip = entry.tls_skip_verify();
        let mut ctx = self.clone();
        ctx.cert_dir = entry.cert_dir.clone();
        ctx.daemon_cert_dir = entry.cert_dir.clone();
        ctx.insecure_skip_tls_verify = skip;
        ctx.daemon_insecure_skip_tls_verify = skip.is_true();
        if !entry.credentials.is_empty() {
            ctx.credentials = Some(entry.credentials.clone());
        }
        ctx
    }

    /// Credentials to present, honouring `no_credentials`.
    pub fn effective_credentials(&self) -> Option<&Credentials> {
        if self.no_credentials {
            return None;
        }
        self.credentials.as_ref().filter(|c| !c.is_empty())
    }

    pub fn skips_tls_verify(&self) -> bool {
        self.insecure_skip_tls_verify.unwrap_or(false)
    }
}
