//! Tracing subscriber setup

use crate::cli::LogFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Target prefixes match every `pitchline_*` crate and the binary.
const DEFAULT_FILTER: &str = "pitchline=info";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
///
/// Logs go to stderr so stdout carries only the run result.
pub fn init_tracing(format: LogFormat) -> Result<(), String> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| format!("Failed to initialize tracing: {e}"))
}
