//! Routing of decoded inbound payloads.
//!
//! Payloads with a `method` are server notifications; payloads whose `id`
//! matches an outstanding request complete it. Everything else is ignored.
use std::collections::HashMap;

use serde_json::Value;

use crate::envelope::methods;

/// What a pending request is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingRequest {
    /// The `initialize` handshake.
    Initialize,
}

/// Outcome of routing one payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// A `textDocument/publishDiagnostics` push; carries its `params`.
    Diagnostics(Value),
    /// A response to one of our requests.
    Completed {
        id: u64,
        request: PendingRequest,
        /// The `error` member, when the server rejected the request.
        error: Option<Value>,
    },
    /// Nothing this client understands.
    Ignored,
}

/// Tracks outstanding requests by id.
#[derive(Debug, Default)]
pub struct Dispatcher {
    pending: HashMap<u64, PendingRequest>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a response to `id` is expected.
    pub fn register_request(&mut self, id: u64, request: PendingRequest) {
        self.pending.insert(id, request);
    }

    /// How many requests are pending.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether `id` is awaiting a response.
    pub fn is_pending(&self, id: u64) -> bool {
        self.pending.contains_key(&id)
    }

    /// Forget every outstanding request.
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    /// Route one decoded payload.
    pub fn dispatch(&mut self, mut payload: Value) -> Dispatch {
        if let Some(method) = payload.get("method").and_then(Value::as_str) {
            if method == methods::PUBLISH_DIAGNOSTICS {
                let params = payload
                    .get_mut("params")
                    .map(Value::take)
                    .unwrap_or(Value::Null);
                return Dispatch::Diagnostics(params);
            }
            tracing::debug!("ignoring server message: {}", method);
            return Dispatch::Ignored;
        }

        let Some(id) = payload.get("id").and_then(Value::as_u64) else {
            tracing::debug!("ignoring payload without method or id");
            return Dispatch::Ignored;
        };

        match self.pending.remove(&id) {
            Some(request) => {
                let error = payload
                    .get_mut("error")
                    .map(Value::take)
                    .filter(|e| !e.is_null());
                Dispatch::Completed { id, request, error }
            }
            None => {
                tracing::warn!("received response for unknown request id: {}", id);
                Dispatch::Ignored
            }
        }
    }
}
