use std::path::Path;

use tracing::{info, instrument};

use crate::config::{Endpoint, TransferTuning};
use crate::error::Error;
use crate::media::{FrameSequenceBuilder, MediaError};
use crate::protocol::{DeviceCommand, ItemId};
use crate::transfer::{ChunkedTransport, ProgressFn, TransferReceipt};
use crate::transport::ChannelConnector;

/// Upload accounting returned on success.
#[derive(Debug, Clone, Copy, Eq, PartialEq, serde::Serialize)]
pub struct UploadReceipt {
    item_id: ItemId,
    animated: bool,
    frame_count: u16,
    #[serde(flatten)]
    transfer: TransferReceipt,
}

impl UploadReceipt {
    /// Slot the payload was stored to.
    #[must_use]
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// Whether the upload was flagged animated on the wire.
    #[must_use]
    pub fn animated(&self) -> bool {
        self.animated
    }

    /// Frames encoded into the payload.
    #[must_use]
    pub fn frame_count(&self) -> u16 {
        self.frame_count
    }

    /// Underlying transfer accounting.
    #[must_use]
    pub fn transfer(&self) -> &TransferReceipt {
        &self.transfer
    }
}

/// Client for one ESP32 matrix device.
///
/// Maps the four high-level operations onto framed, chunked exchanges. All
/// configuration is explicit — an endpoint, a connector, and tunables are
/// passed in; there is no ambient state, and each operation opens and closes
/// its own connection. The device exposes one connection slot, so operations
/// must not run concurrently.
pub struct MatrixClient {
    connector: Box<dyn ChannelConnector>,
    endpoint: Endpoint,
    tuning: TransferTuning,
    progress: Option<Box<ProgressFn>>,
}

impl MatrixClient {
    /// Creates a client with default tunables.
    #[must_use]
    pub fn new(connector: Box<dyn ChannelConnector>, endpoint: Endpoint) -> Self {
        Self {
            connector,
            endpoint,
            tuning: TransferTuning::default(),
            progress: None,
        }
    }

    /// Replaces the transfer tunables.
    #[must_use]
    pub fn with_tuning(mut self, tuning: TransferTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Installs a `(bytes_sent, total_bytes)` progress observer.
    #[must_use]
    pub fn with_progress_observer(
        mut self,
        observer: impl Fn(u64, u64) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Box::new(observer));
        self
    }

    /// Configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Configured tunables.
    #[must_use]
    pub fn tuning(&self) -> &TransferTuning {
        &self.tuning
    }

    /// Converts a source file and uploads it to a storage slot.
    ///
    /// A `.gif` extension claims the animated path, matching the device-side
    /// convention; the container signature is then verified and a mismatch
    /// is rejected before any connection is opened. Any other extension is
    /// treated as a still image.
    ///
    /// # Errors
    ///
    /// Returns an error when the file is unreadable, the media fails to
    /// decode, or the transfer fails.
    #[instrument(skip(self), level = "info", fields(%item_id, path = %source_path.display()))]
    pub async fn upload(
        &self,
        item_id: ItemId,
        source_path: &Path,
    ) -> Result<UploadReceipt, Error> {
        let source_bytes =
            std::fs::read(source_path).map_err(|source| MediaError::SourceRead {
                path: source_path.to_path_buf(),
                source,
            })?;
        let animated = source_path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("gif"));
        self.upload_bytes(item_id, &source_bytes, animated).await
    }

    /// Converts in-memory source bytes and uploads them to a storage slot.
    ///
    /// # Errors
    ///
    /// Returns an error when the media fails to decode — including a source
    /// claimed animated that is not a GIF container — or the transfer fails.
    pub async fn upload_bytes(
        &self,
        item_id: ItemId,
        source_bytes: &[u8],
        animated: bool,
    ) -> Result<UploadReceipt, Error> {
        let builder =
            FrameSequenceBuilder::new(self.tuning.geometry(), self.tuning.max_frames());
        let sequence = if animated {
            builder.build_animated(source_bytes)?
        } else {
            builder.build_still(source_bytes)?
        };
        let frame_count = sequence.frame_count();
        let payload = sequence.to_payload();
        let command = DeviceCommand::Upload {
            id: item_id,
            animated,
            frame_count,
        };

        let transfer = self.send(command, &payload).await?;
        info!(%item_id, frame_count, animated, "upload complete");

        Ok(UploadReceipt {
            item_id,
            animated,
            frame_count,
            transfer,
        })
    }

    /// Sends a text string to a storage slot for immediate display.
    ///
    /// The bytes travel raw; the device makes no encoding guarantee beyond
    /// storing what was sent.
    ///
    /// # Errors
    ///
    /// Returns an error when the text exceeds the 16-bit wire length field
    /// or the transfer fails.
    #[instrument(skip(self, text), level = "info", fields(%item_id, text_len = text.len()))]
    pub async fn send_text(
        &self,
        item_id: ItemId,
        text: &str,
    ) -> Result<TransferReceipt, Error> {
        let command = DeviceCommand::send_text(item_id, text)?;
        let receipt = self.send(command, text.as_bytes()).await?;
        info!(%item_id, "text sent");
        Ok(receipt)
    }

    /// Deletes the stored item in a slot. Header-only, no acknowledgment.
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange fails.
    #[instrument(skip(self), level = "info", fields(%item_id))]
    pub async fn delete_item(&self, item_id: ItemId) -> Result<TransferReceipt, Error> {
        self.send(DeviceCommand::Delete { id: item_id }, &[]).await
    }

    /// Runs the stored item in a slot. Header-only, no acknowledgment.
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange fails.
    #[instrument(skip(self), level = "info", fields(%item_id))]
    pub async fn run_item(&self, item_id: ItemId) -> Result<TransferReceipt, Error> {
        self.send(DeviceCommand::Run { id: item_id }, &[]).await
    }

    async fn send(
        &self,
        command: DeviceCommand,
        payload: &[u8],
    ) -> Result<TransferReceipt, Error> {
        let transport = ChunkedTransport::new(self.connector.as_ref(), self.tuning);
        let receipt = transport
            .send(
                &self.endpoint,
                command,
                payload,
                self.progress.as_deref(),
            )
            .await?;
        Ok(receipt)
    }
}
