use std::io::{self, IsTerminal};
use std::sync::OnceLock;

use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::TelemetryError;

static TRACING_INITIALISED: OnceLock<Result<(), TelemetryError>> = OnceLock::new();

/// Initialises structured logging once per process.
///
/// Pretty human-readable output on an interactive stderr, JSON lines
/// otherwise. The filter comes from `RUST_LOG`, defaulting to `warn`.
pub(crate) fn initialise_tracing() -> Result<(), &'static TelemetryError> {
    TRACING_INITIALISED
        .get_or_init(initialise_tracing_once)
        .as_ref()
        .copied()
}

fn initialise_tracing_once() -> Result<(), TelemetryError> {
    let log_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if io::stderr().is_terminal() {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(false)
                    .with_writer(io::stderr)
                    .with_filter(log_filter),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_writer(io::stderr)
                    .with_filter(log_filter),
            )
            .try_init()?;
    }

    Ok(())
}
