use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{
    DEFAULT_ACK_WINDOW, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FRAMES, Endpoint, TransferTuning,
};
use crate::media::FrameGeometry;
use crate::transport::{ChannelConnector, FakeConnector, TcpConnector};

/// Command-line options for the matrix transfer tool.
#[derive(Debug, Parser)]
#[command(
    name = "emx",
    about = "Send images, GIFs, and text to an ESP32 HUB75 LED matrix."
)]
pub struct Args {
    /// Device address (serial-bridge host for the Bluetooth link).
    #[arg(long, global = true, default_value = "localhost")]
    address: String,
    /// Device channel (RFCOMM channel / bridge port).
    #[arg(long, global = true, default_value_t = 1)]
    channel: u16,
    /// Per-step operation timeout (e.g. `60s`, `1500ms`).
    #[arg(long, global = true, default_value = "60s", value_parser = parse_duration)]
    timeout: Duration,
    /// Payload chunk size in bytes.
    #[arg(long, global = true, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
    /// Unacknowledged bytes allowed in flight before blocking for an ack.
    #[arg(long, global = true, default_value_t = DEFAULT_ACK_WINDOW)]
    ack_window: usize,
    /// Animation frames kept before silent truncation.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_FRAMES)]
    max_frames: usize,
    /// Panel width in pixels.
    #[arg(long, global = true, default_value_t = 64)]
    width: u16,
    /// Panel height in pixels.
    #[arg(long, global = true, default_value_t = 64)]
    height: u16,
    /// Uses the in-memory fake channel instead of a live connection.
    #[arg(long, global = true)]
    fake: bool,
    /// Acknowledgment bytes served by the fake channel, e.g. `AAX`.
    #[arg(long, global = true, requires = "fake")]
    fake_acks: Option<String>,
    /// Output format for receipts; defaults by terminal detection.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Configured device endpoint.
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.address.clone(), self.channel)
    }

    /// Transfer tunables assembled from the global flags.
    ///
    /// # Errors
    ///
    /// Returns an error when the panel geometry flags are zero.
    pub fn tuning(&self) -> anyhow::Result<TransferTuning> {
        let geometry = FrameGeometry::new(self.width, self.height).ok_or_else(|| {
            anyhow::anyhow!("panel geometry cannot be zero: {}x{}", self.width, self.height)
        })?;
        Ok(TransferTuning::builder()
            .chunk_size(self.chunk_size)
            .ack_window(self.ack_window)
            .timeout(self.timeout)
            .max_frames(self.max_frames)
            .geometry(geometry)
            .build())
    }

    /// Builds the channel connector selected by the backend flags.
    #[must_use]
    pub fn connector(&self) -> Box<dyn ChannelConnector> {
        if self.fake {
            match &self.fake_acks {
                Some(acks) => Box::new(FakeConnector::with_ack_bytes(acks.as_bytes())),
                None => Box::new(FakeConnector::acking()),
            }
        } else {
            Box::new(TcpConnector::new())
        }
    }

    /// Requested output format, if any.
    #[must_use]
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.format
    }

    /// Consumes the arguments and returns the subcommand.
    #[must_use]
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Supported CLI commands, one per device operation.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert an image or GIF and upload it to a storage slot.
    Upload {
        /// Storage slot identifier.
        id: u16,
        /// Source image path; a `.gif` extension selects the animated path.
        path: PathBuf,
    },
    /// Store and display a short text string.
    Text {
        /// Storage slot identifier.
        id: u16,
        /// Text to display.
        text: String,
    },
    /// Delete the item stored in a slot.
    Delete {
        /// Storage slot identifier.
        id: u16,
    },
    /// Run the item stored in a slot.
    Run {
        /// Storage slot identifier.
        id: u16,
    },
}

/// Receipt output encodings.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable result lines.
    Pretty,
    /// One JSON document on stdout.
    Json,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}
