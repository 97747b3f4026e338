use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use super::{ByteChannel, ChannelConnector};
use crate::config::Endpoint;

/// Connector for TCP-reachable devices.
///
/// The stock firmware speaks Bluetooth RFCOMM; in deployments where the OS
/// exposes that as a TCP serial bridge (or the panel sits behind a network
/// serial adapter), the endpoint address is the bridge host and the channel
/// is the port.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl TcpConnector {
    /// Creates a TCP connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChannelConnector for TcpConnector {
    async fn connect(&self, endpoint: &Endpoint) -> io::Result<Box<dyn ByteChannel>> {
        let stream = TcpStream::connect((endpoint.address(), endpoint.channel())).await?;
        debug!(%endpoint, "opened stream channel");
        Ok(Box::new(TcpByteChannel { stream }))
    }
}

struct TcpByteChannel {
    stream: TcpStream,
}

#[async_trait]
impl ByteChannel for TcpByteChannel {
    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.stream.write_all(buf).await
    }

    async fn read_byte(&mut self) -> io::Result<u8> {
        self.stream.read_u8().await
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}
