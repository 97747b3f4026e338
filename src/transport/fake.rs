use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{ByteChannel, ChannelConnector};
use crate::config::Endpoint;
use crate::protocol::ACK_BYTE;

/// Shared record of every byte written through a fake channel.
#[derive(Debug, Clone, Default)]
pub struct WriteLog(Arc<Mutex<Vec<u8>>>);

impl WriteLog {
    /// Snapshot of all bytes written so far, in write order.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.0.lock().expect("write log lock should not be poisoned").clone()
    }

    fn append(&self, buf: &[u8]) {
        self.0
            .lock()
            .expect("write log lock should not be poisoned")
            .extend_from_slice(buf);
    }
}

#[derive(Debug, Clone)]
enum FakeBehaviour {
    /// Serve `b'A'` for every acknowledgment read.
    AckForever,
    /// Serve scripted bytes, then fail reads with `UnexpectedEof`.
    AckScript(VecDeque<u8>),
    /// Refuse the connection outright.
    RefuseConnect,
    /// Accept writes but never answer a read.
    StallReads,
}

/// In-memory stand-in for a live device channel.
///
/// Records everything the client writes and serves acknowledgment bytes
/// according to a configured behaviour, so protocol flows can be tested
/// without hardware. Mirrors the device contract: one ack byte per window.
#[derive(Debug, Clone)]
pub struct FakeConnector {
    behaviour: FakeBehaviour,
    log: WriteLog,
    connect_count: Arc<AtomicUsize>,
}

impl FakeConnector {
    /// A device that acknowledges every window with `b'A'`.
    #[must_use]
    pub fn acking() -> Self {
        Self::with_behaviour(FakeBehaviour::AckForever)
    }

    /// A device serving exactly the given acknowledgment bytes, in order.
    ///
    /// Reads past the script fail with `UnexpectedEof`, modelling a peer
    /// that went away mid-transfer.
    #[must_use]
    pub fn with_ack_bytes(acks: impl Into<Vec<u8>>) -> Self {
        Self::with_behaviour(FakeBehaviour::AckScript(acks.into().into()))
    }

    /// A device that refuses connections.
    #[must_use]
    pub fn refusing() -> Self {
        Self::with_behaviour(FakeBehaviour::RefuseConnect)
    }

    /// A device that accepts writes but never acknowledges.
    #[must_use]
    pub fn stalling() -> Self {
        Self::with_behaviour(FakeBehaviour::StallReads)
    }

    fn with_behaviour(behaviour: FakeBehaviour) -> Self {
        Self {
            behaviour,
            log: WriteLog::default(),
            connect_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Record of bytes written across all channels from this connector.
    #[must_use]
    pub fn write_log(&self) -> WriteLog {
        self.log.clone()
    }

    /// Number of connections opened so far.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelConnector for FakeConnector {
    async fn connect(&self, _endpoint: &Endpoint) -> io::Result<Box<dyn ByteChannel>> {
        if matches!(self.behaviour, FakeBehaviour::RefuseConnect) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "fake endpoint refused the connection",
            ));
        }
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeByteChannel {
            behaviour: self.behaviour.clone(),
            log: self.log.clone(),
        }))
    }
}

struct FakeByteChannel {
    behaviour: FakeBehaviour,
    log: WriteLog,
}

#[async_trait]
impl ByteChannel for FakeByteChannel {
    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.log.append(buf);
        Ok(())
    }

    async fn read_byte(&mut self) -> io::Result<u8> {
        match &mut self.behaviour {
            FakeBehaviour::AckForever => Ok(ACK_BYTE),
            FakeBehaviour::AckScript(script) => script.pop_front().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "fake acknowledgment script exhausted",
                )
            }),
            FakeBehaviour::StallReads => std::future::pending().await,
            FakeBehaviour::RefuseConnect => unreachable!("refusing connector never yields a channel"),
        }
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}
