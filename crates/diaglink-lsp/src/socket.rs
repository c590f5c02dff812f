//! Non-blocking byte stream underneath the connection state machine.
//!
//! The state machine never awaits the socket. It polls for status, pulls
//! whatever bytes are available and queues outbound bytes, so one tick can
//! never stall on a slow server.
use std::io;

use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::LspError;

/// Observable stream state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamStatus {
    /// No connection, or the peer closed it.
    #[default]
    None,
    /// A connection attempt is in flight.
    Connecting,
    /// Bytes can flow.
    Connected,
    /// The connection attempt or the connection itself failed.
    Error,
}

/// A byte stream that can be driven from a polling loop.
pub trait Transport {
    /// Start connecting. Failures that can be detected immediately are
    /// returned; everything else surfaces through [`poll`](Self::poll).
    fn connect(&mut self, host: &str, port: u16) -> Result<(), LspError>;

    /// Advance the connection and report its state.
    fn poll(&mut self) -> StreamStatus;

    /// Copy available inbound bytes into `buf`. `Ok(0)` means nothing is
    /// available right now.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, LspError>;

    /// Queue `bytes` for sending.
    fn send(&mut self, bytes: &[u8]) -> Result<(), LspError>;

    /// Drop the connection.
    fn disconnect(&mut self);
}

enum TcpState {
    Idle,
    Connecting {
        result: oneshot::Receiver<io::Result<TcpStream>>,
        task: JoinHandle<()>,
    },
    Connected(TcpStream),
    Failed,
}

/// [`Transport`] over a tokio TCP stream.
///
/// Connecting spawns onto the current tokio runtime; reads and writes use
/// the stream's `try_*` methods so nothing blocks. Bytes the socket does not
/// accept immediately stay queued and are flushed, in order, on later polls.
pub struct TcpTransport {
    state: TcpState,
    outbound: Vec<u8>,
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpTransport {
    pub fn new() -> Self {
        Self {
            state: TcpState::Idle,
            outbound: Vec::new(),
        }
    }

    /// Bytes queued but not yet written.
    pub fn pending_outbound(&self) -> usize {
        self.outbound.len()
    }

    fn status(&self) -> StreamStatus {
        match self.state {
            TcpState::Idle => StreamStatus::None,
            TcpState::Connecting { .. } => StreamStatus::Connecting,
            TcpState::Connected(_) => StreamStatus::Connected,
            TcpState::Failed => StreamStatus::Error,
        }
    }

    /// Write as much of the queue as the socket accepts.
    fn flush(&mut self) {
        let TcpState::Connected(stream) = &self.state else {
            return;
        };
        while !self.outbound.is_empty() {
            match stream.try_write(&self.outbound) {
                Ok(0) => {
                    tracing::warn!("socket accepted no bytes; treating as closed");
                    self.state = TcpState::Failed;
                    return;
                }
                Ok(n) => {
                    self.outbound.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) => {
                    tracing::error!("write failed: {}", e);
                    self.state = TcpState::Failed;
                    return;
                }
            }
        }
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), LspError> {
        self.disconnect();
        let addr = format!("{host}:{port}");

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.state = TcpState::Failed;
                return Err(LspError::Connect {
                    addr,
                    reason: e.to_string(),
                });
            }
        };

        let (tx, rx) = oneshot::channel();
        let target = addr.clone();
        let task = handle.spawn(async move {
            // The receiver is gone if the attempt was abandoned.
            let _ = tx.send(TcpStream::connect(target).await);
        });
        tracing::debug!("connecting to {}", addr);
        self.state = TcpState::Connecting { result: rx, task };
        Ok(())
    }

    fn poll(&mut self) -> StreamStatus {
        if let TcpState::Connecting { result, .. } = &mut self.state {
            match result.try_recv() {
                Ok(Ok(stream)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        tracing::debug!("set_nodelay failed: {}", e);
                    }
                    self.state = TcpState::Connected(stream);
                }
                Ok(Err(e)) => {
                    tracing::error!("connect failed: {}", e);
                    self.state = TcpState::Failed;
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => {
                    tracing::error!("connect task ended without a result");
                    self.state = TcpState::Failed;
                }
            }
        }
        self.flush();
        self.status()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, LspError> {
        let TcpState::Connected(stream) = &self.state else {
            return Ok(0);
        };
        if buf.is_empty() {
            return Ok(0);
        }
        match stream.try_read(buf) {
            Ok(0) => {
                tracing::info!("server closed the connection");
                self.state = TcpState::Idle;
                self.outbound.clear();
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => {
                self.state = TcpState::Failed;
                Err(LspError::Io(e))
            }
        }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), LspError> {
        if !matches!(self.state, TcpState::Connected(_)) {
            return Err(LspError::NotConnected);
        }
        self.outbound.extend_from_slice(bytes);
        self.flush();
        match self.state {
            TcpState::Failed => Err(LspError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "connection failed while writing",
            ))),
            _ => Ok(()),
        }
    }

    fn disconnect(&mut self) {
        if let TcpState::Connecting { task, .. } = &self.state {
            task.abort();
        }
        self.state = TcpState::Idle;
        self.outbound.clear();
    }
}
