use std::io;

use async_trait::async_trait;

use crate::config::Endpoint;

mod fake;
mod tcp;

pub use self::fake::{FakeConnector, WriteLog};
pub use self::tcp::TcpConnector;

/// Reliable, ordered byte channel to one device.
///
/// One command owns a channel exclusively from connect to close; dropping the
/// boxed channel closes it, which is the abort path for callers that need to
/// cancel a transfer mid-flight.
#[async_trait]
pub trait ByteChannel: Send {
    /// Writes the whole buffer to the peer.
    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Blocks for the next single byte from the peer.
    async fn read_byte(&mut self) -> io::Result<u8>;

    /// Flushes and half-closes the write side.
    async fn shutdown(&mut self) -> io::Result<()>;
}

/// Opens fresh channels to a configured endpoint.
///
/// This is the testability seam: production code connects over a live
/// stream, tests inject [`FakeConnector`] with scripted acknowledgments.
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    /// Opens a new channel to the endpoint.
    async fn connect(&self, endpoint: &Endpoint) -> io::Result<Box<dyn ByteChannel>>;
}
