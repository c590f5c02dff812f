//! In-memory transport for driving the state machine from tests.
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::LspError;
use crate::socket::{StreamStatus, Transport};
use crate::transport::{encode_message, FrameDecoder};

#[derive(Default)]
struct State {
    statuses: VecDeque<StreamStatus>,
    current: StreamStatus,
    inbound: VecDeque<Vec<u8>>,
    sent: Vec<u8>,
    connects: Vec<(String, u16)>,
    connect_error: Option<String>,
    fail_sends: bool,
    disconnects: usize,
}

/// Scripted [`Transport`]. Clones share state, so a test keeps one handle
/// while the connection owns another.
///
/// Each `poll` takes the next queued status, or repeats the last one. Each
/// `read_available` returns at most one queued chunk.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<State>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_status(&self, status: StreamStatus) {
        self.state.lock().unwrap().statuses.push_back(status);
    }

    pub fn push_inbound(&self, bytes: Vec<u8>) {
        self.state.lock().unwrap().inbound.push_back(bytes);
    }

    pub fn push_message(&self, payload: &Value) {
        self.push_inbound(encode_message(payload).unwrap());
    }

    pub fn fail_connect(&self, reason: &str) {
        self.state.lock().unwrap().connect_error = Some(reason.to_string());
    }

    pub fn fail_sends(&self) {
        self.state.lock().unwrap().fail_sends = true;
    }

    pub fn connects(&self) -> Vec<(String, u16)> {
        self.state.lock().unwrap().connects.clone()
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }

    /// Every payload sent so far, decoded.
    pub fn sent_messages(&self) -> Vec<Value> {
        let sent = self.state.lock().unwrap().sent.clone();
        FrameDecoder::new()
            .decode_all(&sent)
            .into_iter()
            .map(|r| r.unwrap())
            .collect()
    }

    pub fn sent_methods(&self) -> Vec<String> {
        self.sent_messages()
            .iter()
            .map(|m| m["method"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), LspError> {
        let mut state = self.state.lock().unwrap();
        state.connects.push((host.to_string(), port));
        if let Some(reason) = state.connect_error.clone() {
            state.current = StreamStatus::Error;
            return Err(LspError::Connect {
                addr: format!("{host}:{port}"),
                reason,
            });
        }
        state.current = StreamStatus::Connecting;
        Ok(())
    }

    fn poll(&mut self) -> StreamStatus {
        let mut state = self.state.lock().unwrap();
        if let Some(next) = state.statuses.pop_front() {
            state.current = next;
        }
        state.current
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, LspError> {
        let mut state = self.state.lock().unwrap();
        let Some(mut chunk) = state.inbound.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            state.inbound.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), LspError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_sends {
            return Err(LspError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "scripted failure",
            )));
        }
        if state.current != StreamStatus::Connected {
            return Err(LspError::NotConnected);
        }
        state.sent.extend_from_slice(bytes);
        Ok(())
    }

    fn disconnect(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.disconnects += 1;
        state.current = StreamStatus::None;
    }
}
