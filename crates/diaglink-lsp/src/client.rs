//! Diagnostics client facade.
//!
//! Owns the connection, the poll loop and the collaborators, and reports
//! what happens as [`ClientEvent`]s on a channel.
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::connection::{Connection, Refresh};
use crate::diagnostics::decode_publication;
use crate::dispatcher::{Dispatch, PendingRequest};
use crate::documents::{DocumentSource, FsDocuments};
use crate::envelope::{self, methods};
use crate::error::LspError;
use crate::poll::{PollLoop, ProcessingLease, DEFAULT_TICK_INTERVAL};
use crate::socket::{StreamStatus, TcpTransport, Transport};
use crate::types::Diagnostic;
use crate::uri::{FileUriMapper, UriMapper};

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default server port.
pub const DEFAULT_PORT: u16 = 6005;
/// Default language id sent with opened documents.
pub const DEFAULT_LANGUAGE_ID: &str = "gdscript";

/// Version sent with every `didOpen`. Documents are opened and closed
/// immediately, so no edit history exists.
const DOCUMENT_VERSION: i32 = 1;

/// Connection and document settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub host: String,
    pub port: u16,
    /// Project root; sent in the handshake and used to resolve relative paths.
    pub root: PathBuf,
    pub language_id: String,
    pub tick_interval: Duration,
}

impl ClientOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            root: root.into(),
            language_id: DEFAULT_LANGUAGE_ID.to_string(),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// Something the owner should know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The socket connected and `initialize` was sent.
    Connected,
    /// The handshake round trip finished.
    Initialized,
    /// A full diagnostic set for one document.
    DiagnosticsPublished {
        /// The document URI as the server sent it.
        uri: String,
        diagnostics: Vec<Diagnostic>,
    },
    /// The connection was lost and torn down.
    Disconnected { status: StreamStatus },
}

/// What a tick left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Polling is still requested.
    Continue,
    /// No holds remain; the timer was released.
    Idle,
    /// The connection stopped; the timer was released.
    Stopped,
}

/// Client for one diagnostics server.
pub struct DiagnosticsClient<T> {
    options: ClientOptions,
    connection: Connection<T>,
    poll: PollLoop,
    documents: Box<dyn DocumentSource + Send>,
    mapper: Box<dyn UriMapper + Send>,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl DiagnosticsClient<TcpTransport> {
    /// Client over TCP.
    pub fn tcp(options: ClientOptions) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        Self::new(options, TcpTransport::new())
    }
}

impl<T: Transport> DiagnosticsClient<T> {
    /// Create a client reading documents from disk and mapping URIs under
    /// `options.root`.
    pub fn new(
        options: ClientOptions,
        transport: T,
    ) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let client = Self {
            connection: Connection::new(transport, options.root.clone()),
            poll: PollLoop::new(options.tick_interval),
            documents: Box::new(FsDocuments),
            mapper: Box::new(FileUriMapper::new(options.root.clone())),
            options,
            events,
        };
        (client, rx)
    }

    /// Replace the document reader.
    pub fn with_documents(mut self, documents: impl DocumentSource + Send + 'static) -> Self {
        self.documents = Box::new(documents);
        self
    }

    /// Replace the URI mapper.
    pub fn with_mapper(mut self, mapper: impl UriMapper + Send + 'static) -> Self {
        self.mapper = Box::new(mapper);
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Start connecting and enable polling.
    ///
    /// Polling is enabled even when the attempt fails immediately; the
    /// failure is logged, returned, and also observed by the next tick.
    pub fn connect(&mut self) -> Result<(), LspError> {
        let root_uri = self.root_uri();
        let result = self
            .connection
            .connect(&self.options.host, self.options.port, root_uri);
        if let Err(e) = &result {
            tracing::error!(
                "failed to connect to {}:{}: {}",
                self.options.host,
                self.options.port,
                e
            );
        }
        self.poll.enable();
        result
    }

    /// Tear the connection down and release the timer.
    pub fn disconnect(&mut self) {
        self.connection.disconnect();
        self.poll.cancel();
    }

    /// Add a processing hold. Returns the new count.
    pub fn enable_processing(&mut self) -> i64 {
        self.poll.enable()
    }

    /// Release a processing hold. Returns the new count.
    pub fn disable_processing(&mut self) -> i64 {
        self.poll.disable()
    }

    /// Processing hold released on drop.
    pub fn processing_lease(&mut self) -> ProcessingLease {
        self.poll.lease()
    }

    pub fn activation_count(&self) -> i64 {
        self.poll.activation_count()
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_scheduled()
    }

    pub fn status(&self) -> StreamStatus {
        self.connection.status()
    }

    pub fn is_initialized(&self) -> bool {
        self.connection.is_initialized()
    }

    /// `path` made absolute by the URI mapper.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        self.mapper.resolve(path)
    }

    /// Local path for a URI the server sent.
    pub fn uri_to_path(&self, uri: &str) -> PathBuf {
        self.mapper.uri_to_path(uri)
    }

    /// Ask the server for diagnostics of `path` by opening and closing it.
    /// Returns the URI the document was opened under.
    ///
    /// Relative paths resolve through the URI mapper. Results arrive later
    /// as [`ClientEvent::DiagnosticsPublished`].
    pub fn request_diagnostics(&mut self, path: &Path) -> Result<String, LspError> {
        if self.connection.status() != StreamStatus::Connected {
            return Err(LspError::NotConnected);
        }
        let path = self.resolve_path(path);
        let text = self.documents.read_text(&path)?;
        let uri = self.mapper.path_to_uri(&path)?;

        self.connection.send_notification(
            methods::DID_OPEN,
            envelope::did_open_params(&uri, &text, &self.options.language_id, DOCUMENT_VERSION),
        )?;
        self.connection
            .send_notification(methods::DID_CLOSE, envelope::did_close_params(&uri))?;
        tracing::info!("requested diagnostics for {}", uri);
        Ok(uri)
    }

    /// One polling step: refresh status, then decode and dispatch every
    /// frame available right now. Never waits.
    pub fn tick(&mut self) -> TickOutcome {
        match self.connection.refresh() {
            Refresh::Stop(status) => {
                tracing::warn!("connection stopped ({:?})", status);
                self.disconnect();
                self.emit(ClientEvent::Disconnected { status });
                return TickOutcome::Stopped;
            }
            Refresh::Connected => self.emit(ClientEvent::Connected),
            Refresh::Unchanged => {}
        }

        for payload in self.connection.drain() {
            self.handle(payload);
        }

        if self.poll.is_active() {
            TickOutcome::Continue
        } else {
            self.poll.cancel();
            TickOutcome::Idle
        }
    }

    /// Wait for the next tick. `false` means polling is off.
    pub async fn next_tick(&mut self) -> bool {
        self.poll.wait_tick().await
    }

    /// Tick until no holds remain or the connection stops.
    pub async fn run_until_idle(&mut self) -> TickOutcome {
        loop {
            if !self.next_tick().await {
                return TickOutcome::Idle;
            }
            match self.tick() {
                TickOutcome::Continue => {}
                outcome => return outcome,
            }
        }
    }

    fn handle(&mut self, payload: serde_json::Value) {
        match self.connection.dispatch(payload) {
            Dispatch::Diagnostics(params) => match decode_publication(params, &*self.mapper) {
                Ok(publication) => {
                    tracing::debug!(
                        "{} diagnostics for {}",
                        publication.diagnostics.len(),
                        publication.uri
                    );
                    self.emit(ClientEvent::DiagnosticsPublished {
                        uri: publication.uri,
                        diagnostics: publication.diagnostics,
                    });
                }
                Err(e) => tracing::warn!("dropping publication: {}", e),
            },
            Dispatch::Completed {
                request: PendingRequest::Initialize,
                error,
                ..
            } => self.finish_handshake(error),
            Dispatch::Ignored => {}
        }
    }

    fn finish_handshake(&mut self, error: Option<serde_json::Value>) {
        if let Some(err) = error {
            tracing::warn!("initialize returned an error: {}", err);
        }
        if let Err(e) = self
            .connection
            .send_notification(methods::INITIALIZED, serde_json::json!({}))
        {
            tracing::error!("failed to send initialized: {}", e);
        }
        self.connection.mark_initialized();
        tracing::info!("diagnostics server initialized");
        self.emit(ClientEvent::Initialized);
        self.poll.disable();
    }

    fn emit(&self, event: ClientEvent) {
        // The owner may have stopped listening.
        let _ = self.events.send(event);
    }

    fn root_uri(&self) -> String {
        self.mapper
            .path_to_uri(&self.options.root)
            .unwrap_or_else(|_| format!("file://{}", self.options.root.display()))
    }
}
