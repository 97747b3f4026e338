mod app;
mod cli;
mod client;
mod config;
mod error;
mod media;
mod protocol;
mod telemetry;
mod transfer;
mod transport;

pub use app::run;
pub use cli::{Args, Command, OutputFormat};
pub use client::{MatrixClient, UploadReceipt};
pub use config::{
    DEFAULT_ACK_WINDOW, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FRAMES, DEFAULT_TIMEOUT, Endpoint,
    TransferTuning,
};
pub use error::Error;
pub use media::{
    FrameGeometry, FrameSequence, FrameSequenceBuilder, MediaError, PixelFrame, PixelFrameError,
    StillImageCodec, pack_rgb565, unpack_rgb565,
};
pub use protocol::{ACK_BYTE, DeviceCommand, FramingError, ItemId};
pub use transfer::{ChunkedTransport, ProgressFn, TransferError, TransferReceipt};
pub use transport::{ByteChannel, ChannelConnector, FakeConnector, TcpConnector, WriteLog};
