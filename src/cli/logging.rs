//! Log subscriber of the binary

use clap::ValueEnum;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Install the subscriber for the current thread
///
/// `RUST_LOG` wins over `level`. Logs go to stderr so command output on
/// stdout stays machine readable. Dropping the guard restores the previous
/// subscriber.
pub fn init(level: &str, format: LogFormat) -> Result<DefaultGuard, CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| CliError::InvalidArgument(format!("log level '{}': {}", level, e)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let guard = match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .set_default(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .set_default(),
    };
    Ok(guard)
}
