use thiserror::Error;

use crate::media::MediaError;
use crate::protocol::FramingError;
use crate::transfer::TransferError;

/// Top-level client errors wrapping module-specific error types.
///
/// Every failure surfaces here as a typed result; nothing is swallowed and
/// nothing retries. The variant tells the caller whether retrying from
/// scratch is worthwhile (timeout) or pointless (malformed source).
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Framing(#[from] FramingError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}
