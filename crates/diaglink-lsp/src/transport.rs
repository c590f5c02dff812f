//! Content-Length framing for the diagnostics protocol.
//!
//! Outbound payloads become `Content-Length: N\r\n\r\n{json}`. Inbound bytes
//! are fed into a [`FrameDecoder`], a resumable parser that keeps partial
//! headers and bodies between polling ticks so a frame split across socket
//! reads is reassembled instead of lost.
use serde::Serialize;

use crate::error::{FrameError, LspError};

/// The only header field this protocol emits or understands.
const CONTENT_LENGTH: &str = "Content-Length";

/// End of the header block.
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Largest header block accepted before giving up on finding a terminator.
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Largest body accepted (4 MiB).
pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

/// Prefix a JSON body with its Content-Length header.
pub fn frame_message(body: &[u8]) -> Vec<u8> {
    let header = format!("{}: {}\r\n\r\n", CONTENT_LENGTH, body.len());
    let mut bytes = Vec::with_capacity(header.len() + body.len());
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(body);
    bytes
}

/// Serialize `payload` as compact JSON and frame it.
pub fn encode_message<T: Serialize + ?Sized>(payload: &T) -> Result<Vec<u8>, LspError> {
    let body = serde_json::to_vec(payload).map_err(|e| LspError::Serialization(e.to_string()))?;
    Ok(frame_message(&body))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Accumulating header bytes until `\r\n\r\n`.
    Header,
    /// Header parsed; collecting `len` body bytes.
    Body { len: usize },
    /// Skipping the body of a rejected frame.
    Discard { remaining: usize },
}

/// Incremental frame reassembly.
///
/// Feed it whatever bytes the socket had available; it returns complete
/// payloads and keeps everything else for the next call.
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecodeState,
    header: Vec<u8>,
    body: Vec<u8>,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder positioned at the start of a header.
    pub fn new() -> Self {
        Self {
            state: DecodeState::Header,
            header: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Decode the next payload from `input`, advancing the slice past every
    /// byte consumed.
    ///
    /// Returns `None` once `input` is exhausted without completing a frame;
    /// the partial header or body stays buffered. A `Some(Err(_))` means one
    /// message was dropped and decoding can continue with the remaining input.
    pub fn decode_next(
        &mut self,
        input: &mut &[u8],
    ) -> Option<Result<serde_json::Value, FrameError>> {
        loop {
            match self.state {
                DecodeState::Header => {
                    let (&byte, rest) = input.split_first()?;
                    *input = rest;
                    self.header.push(byte);

                    if self.header.ends_with(HEADER_TERMINATOR) {
                        let parsed = parse_content_length(&self.header);
                        self.header.clear();
                        match parsed {
                            Ok(len) if len > MAX_FRAME_BYTES => {
                                self.state = DecodeState::Discard { remaining: len };
                                return Some(Err(FrameError::BodyTooLarge(len)));
                            }
                            Ok(len) => self.state = DecodeState::Body { len },
                            Err(e) => return Some(Err(e)),
                        }
                    } else if self.header.len() > MAX_HEADER_BYTES {
                        self.header.clear();
                        return Some(Err(FrameError::HeaderTooLarge(MAX_HEADER_BYTES)));
                    }
                }
                DecodeState::Body { len } => {
                    let take = (len - self.body.len()).min(input.len());
                    self.body.extend_from_slice(&input[..take]);
                    *input = &input[take..];
                    if self.body.len() < len {
                        return None;
                    }
                    self.state = DecodeState::Header;
                    let body = std::mem::take(&mut self.body);
                    return Some(parse_body(&body));
                }
                DecodeState::Discard { remaining } => {
                    let take = remaining.min(input.len());
                    *input = &input[take..];
                    if take < remaining {
                        self.state = DecodeState::Discard {
                            remaining: remaining - take,
                        };
                        return None;
                    }
                    self.state = DecodeState::Header;
                }
            }
        }
    }

    /// Decode every complete payload in `input`, in order.
    pub fn decode_all(&mut self, mut input: &[u8]) -> Vec<Result<serde_json::Value, FrameError>> {
        let mut out = Vec::new();
        while let Some(result) = self.decode_next(&mut input) {
            out.push(result);
        }
        out
    }

    /// Whether a partially received frame is buffered.
    pub fn is_mid_frame(&self) -> bool {
        !self.header.is_empty() || self.state != DecodeState::Header
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.state = DecodeState::Header;
        self.header.clear();
        self.body.clear();
    }
}

/// Extract the body length from a complete header block.
///
/// Fields other than `Content-Length` are ignored.
fn parse_content_length(header: &[u8]) -> Result<usize, FrameError> {
    let text = std::str::from_utf8(header).map_err(|_| FrameError::HeaderEncoding)?;
    let mut length = None;

    for field in text.split("\r\n").map(str::trim).filter(|f| !f.is_empty()) {
        match field.strip_prefix(CONTENT_LENGTH) {
            Some(value) => {
                let value = value.trim().trim_start_matches(':').trim();
                let parsed = value
                    .parse::<usize>()
                    .map_err(|_| FrameError::InvalidContentLength(value.to_string()))?;
                length = Some(parsed);
            }
            None => tracing::debug!("ignoring header field {:?}", field),
        }
    }

    length.ok_or_else(|| FrameError::MissingContentLength(text.trim().to_string()))
}

/// Parse a body as a non-empty JSON object.
fn parse_body(body: &[u8]) -> Result<serde_json::Value, FrameError> {
    if body.is_empty() {
        return Err(FrameError::EmptyPayload);
    }
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| FrameError::InvalidJson(e.to_string()))?;
    match &value {
        serde_json::Value::Object(map) if !map.is_empty() => Ok(value),
        _ => Err(FrameError::EmptyPayload),
    }
}
