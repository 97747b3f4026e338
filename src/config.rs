use std::fmt;
use std::time::Duration;

use bon::Builder;

use crate::media::FrameGeometry;

/// Default payload chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 256;
/// Default acknowledgment window in bytes (the device file buffer size).
pub const DEFAULT_ACK_WINDOW: usize = 32 * 1024;
/// Default bound for connect, write, and acknowledgment-read operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// Default cap on stored animation frames.
pub const DEFAULT_MAX_FRAMES: usize = 32;

/// Resolvable device endpoint: an address plus a numeric channel.
///
/// For the stock firmware this is the Bluetooth address and RFCOMM channel 1;
/// the channel doubles as the TCP port when a serial bridge fronts the
/// device. Discovery and pairing are out of scope — the address must already
/// resolve.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Endpoint {
    address: String,
    channel: u16,
}

impl Endpoint {
    /// Creates an endpoint from an address and channel.
    #[must_use]
    pub fn new(address: impl Into<String>, channel: u16) -> Self {
        Self {
            address: address.into(),
            channel,
        }
    }

    /// Device address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Device channel number.
    #[must_use]
    pub fn channel(&self) -> u16 {
        self.channel
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.channel)
    }
}

/// Transfer tunables, all deployment-specific rather than protocol constants.
///
/// ```
/// use emx::TransferTuning;
///
/// let tuning = TransferTuning::builder().build();
/// assert_eq!(256, tuning.chunk_size());
/// assert_eq!(32_768, tuning.ack_window());
/// assert_eq!(32, tuning.max_frames());
/// assert_eq!("64x64", tuning.geometry().to_string());
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq, Builder)]
pub struct TransferTuning {
    /// Payload chunk size in bytes; the final chunk may be shorter.
    #[builder(default = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
    /// Max unacknowledged bytes in flight before blocking for an ack.
    #[builder(default = DEFAULT_ACK_WINDOW)]
    ack_window: usize,
    /// Bound applied to every blocking transport step.
    #[builder(default = DEFAULT_TIMEOUT)]
    timeout: Duration,
    /// Animation frames kept before silent truncation.
    #[builder(default = DEFAULT_MAX_FRAMES)]
    max_frames: usize,
    /// Panel geometry frames are packed against.
    #[builder(default)]
    geometry: FrameGeometry,
}

impl TransferTuning {
    /// Payload chunk size in bytes.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Acknowledgment window in bytes.
    #[must_use]
    pub const fn ack_window(&self) -> usize {
        self.ack_window
    }

    /// Per-step operation timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Animation frame cap.
    #[must_use]
    pub const fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Panel geometry.
    #[must_use]
    pub const fn geometry(&self) -> FrameGeometry {
        self.geometry
    }
}

impl Default for TransferTuning {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn endpoint_displays_address_and_channel() {
        let endpoint = Endpoint::new("a0:a3:b3:ab:11:52", 1);
        assert_eq!("a0:a3:b3:ab:11:52:1", endpoint.to_string());
    }

    #[test]
    fn tuning_builder_accepts_overrides() {
        let geometry = FrameGeometry::new(32, 16).expect("32x16 should be valid");
        let tuning = TransferTuning::builder()
            .chunk_size(64)
            .ack_window(1024)
            .timeout(Duration::from_secs(5))
            .max_frames(8)
            .geometry(geometry)
            .build();

        assert_eq!(64, tuning.chunk_size());
        assert_eq!(1024, tuning.ack_window());
        assert_eq!(Duration::from_secs(5), tuning.timeout());
        assert_eq!(8, tuning.max_frames());
        assert_eq!(geometry, tuning.geometry());
    }
}
