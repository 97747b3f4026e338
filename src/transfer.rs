use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, instrument, trace};

use crate::config::{Endpoint, TransferTuning};
use crate::protocol::{ACK_BYTE, DeviceCommand};
use crate::transport::{ByteChannel, ChannelConnector};

/// Observer invoked with `(bytes_sent, total_bytes)` after each payload chunk.
///
/// Advisory only; transfer correctness never depends on it.
pub type ProgressFn = dyn Fn(u64, u64) + Send + Sync;

/// Errors raised while driving one transfer session.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The endpoint could not be reached.
    #[error("failed to connect to `{endpoint}`")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    /// Connection establishment exceeded the configured timeout.
    #[error("timed out after {timeout_ms}ms connecting to `{endpoint}`")]
    ConnectTimeout { endpoint: String, timeout_ms: u64 },
    /// A mid-stream write failed.
    #[error("stream write failed after {bytes_sent} of {total_bytes} payload bytes")]
    Write {
        bytes_sent: u64,
        total_bytes: u64,
        #[source]
        source: io::Error,
    },
    /// The acknowledgment read failed.
    #[error("stream read failed while waiting for an acknowledgment")]
    Read(#[source] io::Error),
    /// A write or acknowledgment read exceeded the configured timeout.
    #[error("device did not respond within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    /// The peer acknowledged with something other than the sentinel.
    #[error("device sent acknowledgment byte 0x{actual:02X}, expected 0x{expected:02X} (`A`)")]
    BadAck { actual: u8, expected: u8 },
    /// Chunk size tunable is zero.
    #[error("transfer chunk size cannot be zero")]
    InvalidChunkSize,
    /// Acknowledgment window tunable is zero.
    #[error("acknowledgment window cannot be zero")]
    InvalidAckWindow,
}

/// Transfer accounting returned on success.
#[derive(Debug, Clone, Copy, Eq, PartialEq, serde::Serialize)]
pub struct TransferReceipt {
    header_len: usize,
    payload_len: u64,
    chunks_sent: usize,
    acks_received: usize,
}

impl TransferReceipt {
    /// Header bytes written.
    #[must_use]
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Payload bytes written.
    #[must_use]
    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    /// Number of payload chunks written.
    #[must_use]
    pub fn chunks_sent(&self) -> usize {
        self.chunks_sent
    }

    /// Acknowledgment bytes consumed.
    #[must_use]
    pub fn acks_received(&self) -> usize {
        self.acks_received
    }
}

/// Drives one header-plus-payload exchange over a fresh channel.
///
/// The payload is written in fixed-size chunks; whenever the bytes written
/// since the last consumed acknowledgment reach the window, or the payload
/// ends, the session blocks for exactly one acknowledgment byte. Delete/Run
/// commands are header-only and skip the handshake entirely. The channel is
/// closed on every exit path: the session owns it and drops it after a
/// best-effort shutdown.
pub struct ChunkedTransport<'a> {
    connector: &'a dyn ChannelConnector,
    tuning: TransferTuning,
}

impl<'a> ChunkedTransport<'a> {
    /// Creates a transport over the given connector.
    #[must_use]
    pub fn new(connector: &'a dyn ChannelConnector, tuning: TransferTuning) -> Self {
        Self { connector, tuning }
    }

    /// Sends one command and its payload, enforcing the ack window.
    ///
    /// # Errors
    ///
    /// Returns an error when tunables are invalid, the endpoint is
    /// unreachable, any write or acknowledgment read fails or times out, or
    /// the peer acknowledges with a non-sentinel byte. No retries are
    /// attempted; a failed transfer leaves the remote slot undefined.
    #[instrument(
        skip(self, payload, progress),
        level = "info",
        fields(opcode = %(command.opcode() as char), payload_len = payload.len())
    )]
    pub async fn send(
        &self,
        endpoint: &Endpoint,
        command: DeviceCommand,
        payload: &[u8],
        progress: Option<&ProgressFn>,
    ) -> Result<TransferReceipt, TransferError> {
        if self.tuning.chunk_size() == 0 {
            return Err(TransferError::InvalidChunkSize);
        }
        if self.tuning.ack_window() == 0 {
            return Err(TransferError::InvalidAckWindow);
        }

        let limit = self.tuning.timeout();
        let mut channel = match timeout(limit, self.connector.connect(endpoint)).await {
            Err(_elapsed) => {
                return Err(TransferError::ConnectTimeout {
                    endpoint: endpoint.to_string(),
                    timeout_ms: timeout_ms(limit),
                });
            }
            Ok(Err(source)) => {
                return Err(TransferError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                });
            }
            Ok(Ok(channel)) => channel,
        };

        let result = self
            .drive(channel.as_mut(), command, payload, progress)
            .await;

        // Teardown runs on every path; dropping the channel closes it even
        // when the shutdown itself fails.
        let _ = channel.shutdown().await;
        drop(channel);

        result
    }

    async fn drive(
        &self,
        channel: &mut dyn ByteChannel,
        command: DeviceCommand,
        payload: &[u8],
        progress: Option<&ProgressFn>,
    ) -> Result<TransferReceipt, TransferError> {
        let limit = self.tuning.timeout();
        let total_bytes = payload.len() as u64;
        let header = command.encode_header();

        write_bounded(channel, &header, limit, 0, total_bytes).await?;

        let mut receipt = TransferReceipt {
            header_len: header.len(),
            payload_len: 0,
            chunks_sent: 0,
            acks_received: 0,
        };

        if !command.expects_ack() {
            trace!("header-only command, closing immediately");
            return Ok(receipt);
        }

        let mut bytes_sent = 0u64;
        let mut unacked = 0usize;

        for chunk in payload.chunks(self.tuning.chunk_size()) {
            write_bounded(channel, chunk, limit, bytes_sent, total_bytes).await?;
            bytes_sent += chunk.len() as u64;
            unacked += chunk.len();
            receipt.chunks_sent += 1;
            receipt.payload_len = bytes_sent;

            if let Some(observer) = progress {
                observer(bytes_sent, total_bytes);
            }

            // Inclusive OR: reaching the window or finishing the payload both
            // trigger exactly one acknowledgment wait, never two for the same
            // chunk.
            if unacked >= self.tuning.ack_window() || bytes_sent == total_bytes {
                let ack = read_ack_bounded(channel, limit).await?;
                if ack != ACK_BYTE {
                    return Err(TransferError::BadAck {
                        actual: ack,
                        expected: ACK_BYTE,
                    });
                }
                unacked = 0;
                receipt.acks_received += 1;
                debug!(bytes_sent, total_bytes, "window acknowledged");
            }
        }

        Ok(receipt)
    }
}

async fn write_bounded(
    channel: &mut dyn ByteChannel,
    buf: &[u8],
    limit: Duration,
    bytes_sent: u64,
    total_bytes: u64,
) -> Result<(), TransferError> {
    match timeout(limit, channel.write_all(buf)).await {
        Err(_elapsed) => Err(TransferError::Timeout {
            timeout_ms: timeout_ms(limit),
        }),
        Ok(Err(source)) => Err(TransferError::Write {
            bytes_sent,
            total_bytes,
            source,
        }),
        Ok(Ok(())) => Ok(()),
    }
}

async fn read_ack_bounded(
    channel: &mut dyn ByteChannel,
    limit: Duration,
) -> Result<u8, TransferError> {
    match timeout(limit, channel.read_byte()).await {
        Err(_elapsed) => Err(TransferError::Timeout {
            timeout_ms: timeout_ms(limit),
        }),
        Ok(Err(source)) => Err(TransferError::Read(source)),
        Ok(Ok(byte)) => Ok(byte),
    }
}

fn timeout_ms(limit: Duration) -> u64 {
    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX)
}
