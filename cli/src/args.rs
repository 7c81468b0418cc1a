use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use regsync::{DestinationTransport, ManifestFormat, SourceTransport};

use crate::logging::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "regsync", version, about = "Synchronize container images between registries and directories")]
pub struct Cli {
    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[arg(long, global = true, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Abort the whole run after this many seconds.
    #[arg(long, global = true, value_name = "SECONDS")]
    pub command_timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Synchronize images between registry repositories and local directories.
    Sync(SyncArgs),
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Source transport: docker (registry), dir (directory) or yaml.
    #[arg(short = 's', long = "src")]
    pub source_transport: SourceTransport,

    /// Destination transport: docker (registry) or dir (directory).
    #[arg(short = 'd', long = "dest")]
    pub destination_transport: DestinationTransport,

    /// Keep the full source path in destination names.
    #[arg(long)]
    pub scoped: bool,

    /// Copy every image of a manifest list, not only the current platform's.
    #[arg(short = 'a', long)]
    pub all: bool,

    /// Do not copy signatures from the source.
    #[arg(long)]
    pub remove_signatures: bool,

    /// Sign copied images with the key with this fingerprint.
    #[arg(long, value_name = "FINGERPRINT")]
    pub sign_by: Option<String>,

    /// Manifest type to force at the destination (oci, v2s1, v2s2).
    #[arg(short = 'f', long = "format", value_name = "MANIFEST_TYPE")]
    pub format: Option<ManifestFormat>,

    #[command(flatten)]
    pub source_auth: SourceAuthArgs,

    #[command(flatten)]
    pub destination_auth: DestinationAuthArgs,

    /// Retries after the first failed attempt of each operation.
    #[arg(long, default_value_t = regsync::retry::DEFAULT_MAX_RETRIES)]
    pub retry_times: u32,

    /// Fixed delay between retries; exponential backoff when omitted.
    #[arg(long, value_name = "SECONDS")]
    pub retry_delay: Option<u64>,

    /// Program used to copy single images.
    #[arg(long, default_value = regsync::transfer::DEFAULT_COPY_COMMAND)]
    pub copy_command: String,

    /// Registry repository, directory, or YAML file to sync from.
    pub source: String,

    /// Registry prefix or directory to sync into.
    pub destination: String,
}

#[derive(Debug, Args)]
pub struct SourceAuthArgs {
    /// Source registry credentials.
    #[arg(long = "src-creds", value_name = "USERNAME[:PASSWORD]")]
    pub src_creds: Option<String>,

    #[arg(long = "src-password", env = "REGSYNC_SRC_PASSWORD", hide = true, hide_env_values = true)]
    pub src_password: Option<String>,

    /// Directory with certificates (*.crt) for the source registry.
    #[arg(long = "src-cert-dir", value_name = "PATH")]
    pub src_cert_dir: Option<PathBuf>,

    /// Require HTTPS and verify certificates when talking to the source registry.
    #[arg(long = "src-tls-verify", value_name = "BOOL")]
    pub src_tls_verify: Option<bool>,

    /// Bearer token for the source registry.
    #[arg(long = "src-registry-token", value_name = "TOKEN")]
    pub src_registry_token: Option<String>,

    /// Access the source registry anonymously.
    #[arg(long = "src-no-creds")]
    pub src_no_creds: bool,
}

#[derive(Debug, Args)]
pub struct DestinationAuthArgs {
    /// Destination registry credentials.
    #[arg(long = "dest-creds", value_name = "USERNAME[:PASSWORD]")]
    pub dest_creds: Option<String>,

    #[arg(long = "dest-password", env = "REGSYNC_DEST_PASSWORD", hide = true, hide_env_values = true)]
    pub dest_password: Option<String>,

    /// Directory with certificates (*.crt) for the destination registry.
    #[arg(long = "dest-cert-dir", value_name = "PATH")]
    pub dest_cert_dir: Option<PathBuf>,

    /// Require HTTPS and verify certificates when talking to the destination registry.
    #[arg(long = "dest-tls-verify", value_name = "BOOL")]
    pub dest_tls_verify: Option<bool>,

    /// Bearer token for the destination registry.
    #[arg(long = "dest-registry-token", value_name = "TOKEN")]
    pub dest_registry_token: Option<String>,

    /// Access the destination registry anonymously.
    #[arg(long = "dest-no-creds")]
    pub dest_no_creds: bool,
}

/// One side's connection flags, independent of the `src`/`dest` prefix.
pub struct AuthFlags<'a> {
    pub creds: Option<&'a str>,
    pub password: Option<&'a str>,
    pub cert_dir: Option<&'a PathBuf>,
    pub tls_verify: Option<bool>,
    pub registry_token: Option<&'a str>,
    pub no_creds: bool,
}

impl SourceAuthArgs {
    pub fn flags(&self) -> AuthFlags<'_> {
        AuthFlags {
            creds: self.src_creds.as_deref(),
            password: self.src_password.as_deref(),
            cert_dir: self.src_cert_dir.as_ref(),
            tls_verify: self.src_tls_verify,
            registry_token: self.src_registry_token.as_deref(),
            no_creds: self.src_no_creds,
        }
    }
}

impl DestinationAuthArgs {
    pub fn flags(&self) -> AuthFlags<'_> {
        AuthFlags {
            creds: self.dest_creds.as_deref(),
            password: self.dest_password.as_deref(),
            cert_dir: self.dest_cert_dir.as_ref(),
            tls_verify: self.dest_tls_verify,
            registry_token: self.dest_registry_token.as_deref(),
            no_creds: self.dest_no_creds,
        }
    }
}
