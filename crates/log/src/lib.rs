use anyhow::{Context, Result};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter applied when `RUST_LOG` is unset. Chat front ends print their
/// transcript on stdout, so only problems are logged by default.
const DEFAULT_FILTER: &str = "warn";

/// Initializes the logging subsystem for the application.
///
/// Installs a global `tracing` subscriber writing to stderr and bridges
/// records from the `log` facade into it. The level is controlled via the
/// RUST_LOG environment variable:
/// * `RUST_LOG=debug` - every state transition and message
/// * `RUST_LOG=info` - connections opened and closed
/// * `RUST_LOG=warn` - failures only (default)
///
/// With `json` set, records are emitted as one JSON object per line.
pub fn init_logging(json: bool) -> Result<()> {
    LogTracer::init().context("failed to set logger")?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if json {
        let subscriber = builder
            .json()
            .with_current_span(true)
            .with_span_events(fmt::format::FmtSpan::CLOSE)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = builder.with_target(false).finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    installed.context("failed to set global subscriber")
}
