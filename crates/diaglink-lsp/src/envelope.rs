//! JSON-RPC envelopes and the handful of methods this client speaks.
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Method names used on the wire.
pub mod methods {
    /// Handshake request, always the first message on a connection.
    pub const INITIALIZE: &str = "initialize";
    /// Handshake acknowledgement sent after the initialize response.
    pub const INITIALIZED: &str = "initialized";
    /// A document was opened on the client.
    pub const DID_OPEN: &str = "textDocument/didOpen";
    /// A document was closed on the client.
    pub const DID_CLOSE: &str = "textDocument/didClose";
    /// Server push carrying the full diagnostic set for one document.
    pub const PUBLISH_DIAGNOSTICS: &str = "textDocument/publishDiagnostics";
}

/// A request (`id` present) or notification (`id` absent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub method: String,
    pub params: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl Envelope {
    /// Whether a response is expected for this envelope.
    pub fn is_request(&self) -> bool {
        self.id.is_some()
    }
}

/// Build a request envelope carrying `id`.
pub fn make_request(method: &str, params: serde_json::Value, id: u64) -> Envelope {
    Envelope {
        method: method.to_string(),
        params,
        id: Some(id),
    }
}

/// Build a notification envelope.
pub fn make_notification(method: &str, params: serde_json::Value) -> Envelope {
    Envelope {
        method: method.to_string(),
        params,
        id: None,
    }
}

/// Monotonic request id allocator. Ids start at 0 and are never reused for
/// the lifetime of one connection.
#[derive(Debug, Default)]
pub struct RequestIds {
    next: u64,
}

impl RequestIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the current id and advance.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// The id the next call to [`next_id`](Self::next_id) will return.
    pub fn peek(&self) -> u64 {
        self.next
    }
}

/// Parameters of the `initialize` request.
pub fn initialize_params(root_path: &Path, root_uri: &str) -> serde_json::Value {
    serde_json::json!({
        "processId": null,
        "rootPath": root_path.display().to_string(),
        "rootUri": root_uri,
        "capabilities": {
            "textDocument": {
                "publishDiagnostics": {}
            }
        }
    })
}

/// Parameters of `textDocument/didOpen`.
pub fn did_open_params(uri: &str, text: &str, language_id: &str, version: i32) -> serde_json::Value {
    serde_json::json!({
        "textDocument": {
            "uri": uri,
            "text": text,
            "languageId": language_id,
            "version": version
        }
    })
}

/// Parameters of `textDocument/didClose`.
pub fn did_close_params(uri: &str) -> serde_json::Value {
    serde_json::json!({
        "textDocument": {
            "uri": uri
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{encode_message, FrameDecoder};
    use serde_json::json;

    #[test]
    fn request_ids_start_at_zero_and_increase() {
        let mut ids = RequestIds::new();
        let issued: Vec<u64> = (0..5).map(|_| ids.next_id()).collect();
        assert_eq!(issued, vec![0, 1, 2, 3, 4]);
        assert_eq!(ids.peek(), 5);
    }

    #[test]
    fn request_serializes_with_id() {
        let env = make_request(methods::INITIALIZE, json!({"a": 1}), 0);
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value, json!({"method": "initialize", "params": {"a": 1}, "id": 0}));
        assert!(env.is_request());
    }

    #[test]
    fn notification_omits_id() {
        let env = make_notification(methods::INITIALIZED, json!({}));
        let value = serde_json::to_value(&env).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["method"], "initialized");
        assert!(!env.is_request());
    }

    #[test]
    fn envelopes_survive_the_wire() {
        let sent = vec![
            make_request(methods::INITIALIZE, json!({"rootUri": "file:///proj"}), 0),
            make_notification(methods::DID_CLOSE, did_close_params("file:///proj/a.gd")),
        ];
        let mut decoder = FrameDecoder::new();
        for env in &sent {
            let bytes = encode_message(env).unwrap();
            let decoded = decoder.decode_all(&bytes).remove(0).unwrap();
            let back: Envelope = serde_json::from_value(decoded).unwrap();
            assert_eq!(&back, env);
        }
    }

    #[test]
    fn initialize_params_shape() {
        let params = initialize_params(Path::new("/proj"), "file:///proj");
        assert!(params["processId"].is_null());
        assert_eq!(params["rootPath"], "/proj");
        assert_eq!(params["rootUri"], "file:///proj");
        assert_eq!(
            params["capabilities"]["textDocument"]["publishDiagnostics"],
            json!({})
        );
    }

    #[test]
    fn did_open_params_shape() {
        let params = did_open_params("file:///proj/a.gd", "extends Node", "gdscript", 1);
        let doc = &params["textDocument"];
        assert_eq!(doc["uri"], "file:///proj/a.gd");
        assert_eq!(doc["text"], "extends Node");
        assert_eq!(doc["languageId"], "gdscript");
        assert_eq!(doc["version"], 1);
    }

    #[test]
    fn did_close_params_shape() {
        let params = did_close_params("file:///proj/a.gd");
        assert_eq!(params, json!({"textDocument": {"uri": "file:///proj/a.gd"}}));
    }
}
