//! Transfer implementation that drives an external copy tool.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::auth_file::AuthFile;
use super::error::TransferError;
use super::options::{ImageListSelection, TransferOptions};
use super::{ImageTransfer, TransferRequest};
use crate::context::{ConnectionContext, OptionalBool};

/// Default copy tool, invoked as `<program> copy [flags] SOURCE DESTINATION`.
pub const DEFAULT_COPY_COMMAND: &str = "skopeo";

/// Maximum stderr length carried into an error.
const MAX_STDERR_LENGTH: usize = 2000;

/// Copies images by running `skopeo copy` (or a compatible program).
#[derive(Debug, Clone)]
pub struct CommandTransfer {
    program: String,
}

impl Default for CommandTransfer {
    fn default() -> Self {
        Self::new(DEFAULT_COPY_COMMAND)
    }
}

impl CommandTransfer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments after the program name.
    ///
    /// Credentials are referenced through `auth_files`, never inlined.
    pub fn build_args(
        &self,
        request: &TransferRequest<'_>,
        auth_files: &AuthFiles,
    ) -> Vec<String> {
        let mut args = vec!["copy".to_string()];
        push_context_flags(
            &mut args,
            "src",
            request.source_context,
            auth_files.source.as_ref(),
        );
        push_context_flags(
            &mut args,
            "dest",
            request.destination_context,
            auth_files.destination.as_ref(),
        );
        push_option_flags(&mut args, request.options);
        args.push(request.source.to_string());
        args.push(request.destination.to_string());
        args
    }
}

/// Auth files for both sides of one copy; removed on drop.
#[derive(Debug, Default)]
pub struct AuthFiles {
    pub source: Option<AuthFile>,
    pub destination: Option<AuthFile>,
}

impl AuthFiles {
    pub fn write(request: &TransferRequest<'_>) -> Result<Self, TransferError> {
        Ok(Self {
            source: AuthFile::for_side(request.source, request.source_context)?,
            destination: AuthFile::for_side(request.destination, request.destination_context)?,
        })
    }
}

fn push_context_flags(
    args: &mut Vec<String>,
    side: &str,
    ctx: &ConnectionContext,
    auth_file: Option<&AuthFile>,
) {
    match ctx.insecure_skip_tls_verify {
        OptionalBool::True => args.push(format!("--{}-tls-verify=false", side)),
        OptionalBool::False => args.push(format!("--{}-tls-verify=true", side)),
        OptionalBool::Unset => {}
    }
    if let Some(dir) = &ctx.cert_dir {
        args.push(format!("--{}-cert-dir", side));
        args.push(dir.display().to_string());
    }
    if ctx.no_credentials {
        args.push(format!("--{}-no-creds", side));
    } else if let Some(file) = auth_file {
        args.push(format!("--{}-authfile", side));
        args.push(file.path().display().to_string());
    }
    // The copy tool only accepts a registry token as an argument.
    if let Some(token) = &ctx.registry_token {
        args.push(format!("--{}-registry-token", side));
        args.push(token.expose().to_string());
    }
}

fn push_option_flags(args: &mut Vec<String>, options: &TransferOptions) {
    if options.remove_signatures {
        args.push("--remove-signatures".to_string());
    }
    if let Some(key) = &options.sign_by {
        args.push("--sign-by".to_string());
        args.push(key.clone());
    }
    if let Some(format) = options.manifest_format {
        args.push("--format".to_string());
        args.push(format.name().to_string());
    }
    if options.image_list_selection == ImageListSelection::All {
        args.push("--all".to_string());
    }
}

fn truncate_stderr(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= MAX_STDERR_LENGTH {
        return text.to_string();
    }
    let mut start = text.len() - MAX_STDERR_LENGTH;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}

#[async_trait]
impl ImageTransfer for CommandTransfer {
    async fn transfer(&self, request: &TransferRequest<'_>) -> Result<(), TransferError> {
        debug!(
            program = %self.program,
            from = %request.source,
            to = %request.destination,
            "Running copy command"
        );

        if request.source_context.registry_token.is_some()
            || request.destination_context.registry_token.is_some()
        {
            warn!("Registry tokens are passed to the copy command as arguments");
        }

        let auth_files = AuthFiles::write(request)?;
        let output = Command::new(&self.program)
            .args(self.build_args(request, &auth_files))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TransferError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;
        drop(auth_files);

        if output.status.success() {
            Ok(())
        } else {
            Err(TransferError::CommandFailed {
                status: output.status.to_string(),
                stderr: truncate_stderr(&output.stderr),
            })
        }
    }
}
