mod args;
mod logging;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use regsync::config::parse_verify_flag;
use regsync::transfer::ImageListSelection;
use regsync::{
    ConfigError, ConnectionContext, Credentials, RegistryToken, RetryPolicy, SyncExecutor,
    SyncOptions, TransferOptions,
};

use crate::args::{AuthFlags, Cli, Command, SyncArgs};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_level, cli.log_format) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    let cancel = CancellationToken::new();
    if let Err(e) = install_interrupt_handler(cancel.clone()) {
        warn!("Ctrl-C will not cancel the sync: {:#}", e);
    }
    if let Some(secs) = cli.command_timeout {
        let deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            warn!("Command timeout of {}s reached, cancelling", secs);
            deadline.cancel();
        });
    }

    let result = match &cli.command {
        Command::Sync(args) => sync(args, &cancel).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn install_interrupt_handler(cancel: CancellationToken) -> Result<()> {
    ctrlc::set_handler(move || {
        eprintln!("Interrupted, stopping after the current operation...");
        cancel.cancel();
    })
    .context("failed to install signal handler")
}

async fn sync(args: &SyncArgs, cancel: &CancellationToken) -> Result<()> {
    let options = sync_options(args)?;
    let executor = SyncExecutor::with_copy_command(&args.copy_command);

    let summary = executor
        .run(&args.source, &args.destination, &options, cancel)
        .await
        .with_context(|| format!("sync of \"{}\" failed", args.source))?;

    info!(
        images = summary.images_copied,
        sources = summary.sources,
        "Sync complete"
    );
    Ok(())
}

fn sync_options(args: &SyncArgs) -> Result<SyncOptions> {
    let mut options = SyncOptions::new(args.source_transport, args.destination_transport);
    options.scoped = args.scoped;
    options.transfer = TransferOptions {
        remove_signatures: args.remove_signatures,
        sign_by: args.sign_by.clone(),
        manifest_format: args.format,
        image_list_selection: if args.all {
            ImageListSelection::All
        } else {
            ImageListSelection::System
        },
        optimize_destination_image_already_exists: true,
    };
    options.retry = RetryPolicy::new(args.retry_times, args.retry_delay.map(Duration::from_secs));
    options.source_context =
        connection_context(args.source_auth.flags()).context("invalid source options")?;
    options.destination_context = connection_context(args.destination_auth.flags())
        .context("invalid destination options")?;
    Ok(options)
}

fn connection_context(flags: AuthFlags<'_>) -> Result<ConnectionContext, ConfigError> {
    let credentials = match flags.creds {
        Some(raw) => {
            let creds = Credentials::parse(raw).ok_or_else(|| {
                ConfigError::InvalidCredentials("expected USERNAME[:PASSWORD]".to_string())
            })?;
            match flags.password {
                Some(password) if creds.password.expose_secret().is_empty() => {
                    Some(Credentials::new(creds.username, password))
                }
                _ => Some(creds),
            }
        }
        None => None,
    };

    if flags.no_creds && credentials.is_some() {
        return Err(ConfigError::InvalidCredentials(
            "credentials and --*-no-creds are mutually exclusive".to_string(),
        ));
    }

    let insecure_skip_tls_verify = flags.tls_verify.map(parse_verify_flag).unwrap_or_default();

    Ok(ConnectionContext {
        cert_dir: flags.cert_dir.cloned(),
        daemon_cert_dir: flags.cert_dir.cloned(),
        insecure_skip_tls_verify,
        daemon_insecure_skip_tls_verify: insecure_skip_tls_verify.is_true(),
        credentials,
        registry_token: flags.registry_token.map(RegistryToken::new),
        no_credentials: flags.no_creds,
    })
}
