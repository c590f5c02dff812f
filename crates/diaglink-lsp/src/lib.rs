//! diaglink-lsp: client for a text-document diagnostics server over TCP.
//!
//! Speaks Content-Length framed JSON-RPC. The client connects, performs the
//! initialize handshake, opens and closes documents on request and decodes
//! the diagnostics the server pushes back. Everything is driven by an
//! activation-counted polling loop; no call ever blocks on the socket.
pub mod client;
pub mod connection;
pub mod diagnostics;
pub mod dispatcher;
pub mod documents;
pub mod envelope;
pub mod error;
pub mod poll;
pub mod session;
pub mod socket;
pub mod transport;
pub mod types;
pub mod uri;

#[cfg(test)]
mod test_support;

// Re-export key types for convenience.
pub use client::{ClientEvent, ClientOptions, DiagnosticsClient, TickOutcome};
pub use diagnostics::{decode_publication, Publication};
pub use documents::{DocumentSource, FsDocuments, InMemoryDocuments};
pub use error::{FrameError, LspError};
pub use poll::{PollLoop, ProcessingLease};
pub use session::{check_files, FileReport, Report};
pub use socket::{StreamStatus, TcpTransport, Transport};
pub use transport::{encode_message, FrameDecoder};
pub use types::{Diagnostic, Severity};
pub use uri::{FileUriMapper, UriMapper};
