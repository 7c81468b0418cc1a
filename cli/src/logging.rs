use anyhow::{anyhow, Result};
use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

/// Output format of the log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Installs the global subscriber and routes `log` records into it.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_target(false).with_writer(std::io::stderr)),
        ),
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_target(false).with_writer(std::io::stderr)),
        ),
    }
    .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;

    tracing_log::LogTracer::init().map_err(|err| anyhow!("failed to bridge log records: {err}"))
}
