//! Error types for the diagnostics client.
use std::path::PathBuf;

/// Errors from client operations.
#[derive(Debug, thiserror::Error)]
pub enum LspError {
    /// The transport could not start a connection attempt.
    #[error("connect to {addr} failed: {reason}")]
    Connect {
        /// `host:port` that was dialled.
        addr: String,
        /// Why the attempt failed.
        reason: String,
    },

    /// An operation needed an established connection.
    #[error("not connected")]
    NotConnected,

    /// The connection ended before the operation finished.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// The operation did not finish in time.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A frame could not be decoded.
    #[error("framing error: {0}")]
    Frame(#[from] FrameError),

    /// A payload had the wrong shape for its method.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A local path could not be expressed as a `file://` URI.
    #[error("cannot convert path to URI: {}", .0.display())]
    Uri(PathBuf),

    /// A document's contents could not be read.
    #[error("cannot read {}: {reason}", path.display())]
    Document {
        /// The document that was requested.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Protocol framing violations. Each one drops a single message; none of
/// them is fatal for the connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// No terminator within the accepted header size.
    #[error("header block exceeds {0} bytes")]
    HeaderTooLarge(usize),

    /// The header block is not valid UTF-8.
    #[error("header is not valid UTF-8")]
    HeaderEncoding,

    /// The header block carries no `Content-Length` field.
    #[error("missing Content-Length header in {0:?}")]
    MissingContentLength(String),

    /// The `Content-Length` value is not a decimal byte count.
    #[error("invalid Content-Length value {0:?}")]
    InvalidContentLength(String),

    /// Declared body length above the accepted maximum.
    #[error("Content-Length {0} exceeds maximum")]
    BodyTooLarge(usize),

    /// The body is not valid JSON text.
    #[error("invalid JSON body: {0}")]
    InvalidJson(String),

    /// The body parsed to something other than a non-empty object.
    #[error("empty payload")]
    EmptyPayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_connect_display() {
        let err = LspError::Connect {
            addr: "127.0.0.1:6005".into(),
            reason: "no runtime".into(),
        };
        assert_eq!(err.to_string(), "connect to 127.0.0.1:6005 failed: no runtime");
    }

    #[test]
    fn error_not_connected_display() {
        assert_eq!(LspError::NotConnected.to_string(), "not connected");
    }

    #[test]
    fn error_connection_lost_display() {
        let err = LspError::ConnectionLost("server closed the connection".into());
        assert_eq!(err.to_string(), "connection lost: server closed the connection");
    }

    #[test]
    fn error_timeout_display() {
        let err = LspError::Timeout(std::time::Duration::from_secs(10));
        assert_eq!(err.to_string(), "timed out after 10s");
    }

    #[test]
    fn error_frame_from() {
        let err = LspError::from(FrameError::EmptyPayload);
        assert_eq!(err.to_string(), "framing error: empty payload");
    }

    #[test]
    fn error_document_display() {
        let err = LspError::Document {
            path: PathBuf::from("/proj/a.gd"),
            reason: "permission denied".into(),
        };
        assert_eq!(err.to_string(), "cannot read /proj/a.gd: permission denied");
    }

    #[test]
    fn error_uri_display() {
        let err = LspError::Uri(PathBuf::from("relative.gd"));
        assert!(err.to_string().contains("relative.gd"));
    }

    #[test]
    fn error_io_from() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken");
        let err = LspError::from(io);
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn frame_error_display() {
        assert_eq!(
            FrameError::InvalidContentLength("abc".into()).to_string(),
            "invalid Content-Length value \"abc\""
        );
        assert_eq!(
            FrameError::HeaderTooLarge(8192).to_string(),
            "header block exceeds 8192 bytes"
        );
    }
}
