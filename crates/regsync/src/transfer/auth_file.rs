//! Short-lived registry auth files handed to the copy tool.
//!
//! Credentials are written in the containers `auth.json` format to a private
//! temporary file so they never appear on the child's command line. The file
//! is removed when the [`AuthFile`] is dropped.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use secrecy::ExposeSecret;
use serde::Serialize;
use tempfile::NamedTempFile;

use super::error::TransferError;
use crate::config::Credentials;
use crate::context::ConnectionContext;
use crate::reference::ImageReference;

#[derive(Serialize)]
struct AuthConfig {
    auths: BTreeMap<String, AuthEntry>,
}

#[derive(Serialize)]
struct AuthEntry {
    auth: String,
}

/// A temporary `auth.json` holding one registry's credentials.
#[derive(Debug)]
pub struct AuthFile {
    file: NamedTempFile,
}

impl AuthFile {
    /// Writes `credentials` for `registry` to a new private temporary file.
    pub fn write(registry: &str, credentials: &Credentials) -> Result<Self, TransferError> {
        let encoded = general_purpose::STANDARD.encode(format!(
            "{}:{}",
            credentials.username,
            credentials.password.expose_secret()
        ));
        let config = AuthConfig {
            auths: BTreeMap::from([(registry.to_string(), AuthEntry { auth: encoded })]),
        };
        let body = serde_json::to_vec(&config)
            .map_err(|e| TransferError::AuthFile(std::io::Error::other(e)))?;

        let mut file = tempfile::Builder::new()
            .prefix("regsync-auth-")
            .suffix(".json")
            .tempfile()
            .map_err(TransferError::AuthFile)?;
        file.write_all(&body).map_err(TransferError::AuthFile)?;
        file.flush().map_err(TransferError::AuthFile)?;

        Ok(Self { file })
    }

    /// Writes an auth file for one side of a transfer, if that side needs one.
    ///
    /// Only registry references carry credentials; anonymous contexts and
    /// directory references get no file.
    pub fn for_side(
        reference: &ImageReference,
        ctx: &ConnectionContext,
    ) -> Result<Option<Self>, TransferError> {
        match (reference.as_registry(), ctx.effective_credentials()) {
            (Some(registry), Some(credentials)) => {
                Self::write(registry.domain(), credentials).map(Some)
            }
            _ => Ok(None),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
