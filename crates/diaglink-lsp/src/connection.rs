//! Connection lifecycle: status transitions, handshake trigger and the
//! inbound byte pump.
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::dispatcher::{Dispatch, Dispatcher, PendingRequest};
use crate::envelope::{self, methods, RequestIds};
use crate::error::LspError;
use crate::socket::{StreamStatus, Transport};
use crate::transport::{encode_message, FrameDecoder};

/// Size of one socket read.
const READ_CHUNK: usize = 8 * 1024;

/// Result of re-polling the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Nothing the owner needs to act on.
    Unchanged,
    /// The stream just became connected and `initialize` was sent.
    Connected,
    /// The stream is gone; the owner must disconnect.
    Stop(StreamStatus),
}

/// One client connection and its per-connection protocol state.
pub struct Connection<T> {
    transport: T,
    status: StreamStatus,
    ids: RequestIds,
    dispatcher: Dispatcher,
    decoder: FrameDecoder,
    initialized: bool,
    root: PathBuf,
    root_uri: String,
    read_buf: Vec<u8>,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T, root: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            status: StreamStatus::None,
            ids: RequestIds::new(),
            dispatcher: Dispatcher::new(),
            decoder: FrameDecoder::new(),
            initialized: false,
            root: root.into(),
            root_uri: String::new(),
            read_buf: vec![0; READ_CHUNK],
        }
    }

    /// Start connecting with fresh protocol state. `root_uri` is sent in
    /// the handshake.
    pub fn connect(&mut self, host: &str, port: u16, root_uri: String) -> Result<(), LspError> {
        self.reset_session();
        self.root_uri = root_uri;
        tracing::info!("connecting to {}:{}", host, port);
        self.transport.connect(host, port)
    }

    /// Tear the connection down. Request ids and the handshake flag are
    /// left as they are.
    pub fn disconnect(&mut self) {
        tracing::info!("disconnecting from diagnostics server");
        self.transport.disconnect();
        self.status = StreamStatus::None;
    }

    /// Re-poll the transport and apply the transition rules.
    ///
    /// Entering `Connected` from any other status sends `initialize`; staying
    /// connected does nothing. `None` and `Error` ask the owner to stop.
    pub fn refresh(&mut self) -> Refresh {
        let status = self.transport.poll();
        let previous = std::mem::replace(&mut self.status, status);

        match status {
            StreamStatus::None | StreamStatus::Error => Refresh::Stop(status),
            StreamStatus::Connected if previous != StreamStatus::Connected => {
                tracing::info!("connected to diagnostics server");
                match self.send_initialize() {
                    Ok(id) => {
                        tracing::debug!("sent initialize (id {})", id);
                        Refresh::Connected
                    }
                    Err(e) => {
                        tracing::error!("failed to send initialize: {}", e);
                        self.status = StreamStatus::Error;
                        Refresh::Stop(StreamStatus::Error)
                    }
                }
            }
            _ => Refresh::Unchanged,
        }
    }

    fn send_initialize(&mut self) -> Result<u64, LspError> {
        let params = envelope::initialize_params(&self.root, &self.root_uri);
        self.send_request(methods::INITIALIZE, params, PendingRequest::Initialize)
    }

    /// Send a request and record it as pending. Returns its id.
    pub fn send_request(
        &mut self,
        method: &str,
        params: Value,
        pending: PendingRequest,
    ) -> Result<u64, LspError> {
        let id = self.ids.next_id();
        let bytes = encode_message(&envelope::make_request(method, params, id))?;
        self.transport.send(&bytes)?;
        self.dispatcher.register_request(id, pending);
        Ok(id)
    }

    /// Send a notification.
    pub fn send_notification(&mut self, method: &str, params: Value) -> Result<(), LspError> {
        let bytes = encode_message(&envelope::make_notification(method, params))?;
        self.transport.send(&bytes)?;
        tracing::debug!("sent {}", method);
        Ok(())
    }

    /// Read everything available right now and decode every complete frame.
    ///
    /// Partial frames stay buffered for the next call. Framing errors drop
    /// one message each and are logged.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut payloads = Vec::new();
        loop {
            let n = match self.transport.read_available(&mut self.read_buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    tracing::error!("read failed: {}", e);
                    break;
                }
            };
            let mut input = &self.read_buf[..n];
            while let Some(result) = self.decoder.decode_next(&mut input) {
                match result {
                    Ok(payload) => payloads.push(payload),
                    Err(e) => tracing::warn!("dropping inbound message: {}", e),
                }
            }
        }
        payloads
    }

    /// Route one decoded payload.
    pub fn dispatch(&mut self, payload: Value) -> Dispatch {
        self.dispatcher.dispatch(payload)
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Status seen on the last refresh.
    pub fn status(&self) -> StreamStatus {
        self.status
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The id the next request will carry.
    pub fn next_request_id(&self) -> u64 {
        self.ids.peek()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn reset_session(&mut self) {
        self.ids = RequestIds::new();
        self.dispatcher.cancel_all();
        self.decoder.reset();
        self.initialized = false;
        self.status = StreamStatus::None;
    }
}
