//! Line decoder for the agent's SSE body.
//!
//! Turns raw body chunks into JSON payloads. Only `data:` lines carry
//! payloads; blank separators, other fields, comments, the `[DONE]`
//! sentinel and anything that is not valid JSON are dropped without
//! interrupting the stream.

use futures_util::stream::{self, Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;

use crate::traits::{ByteStream, HttpError};

/// Payload that marks the end of the event stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Lazily decoded payloads of one response body.
///
/// Finite and not restartable. A transport failure is yielded once as the
/// last item.
pub type PayloadStream = Pin<Box<dyn Stream<Item = Result<Value, HttpError>> + Send>>;

/// Classified SSE line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// Frame separator
    Empty,
    /// `data:` field, prefix stripped and trimmed
    Data(String),
    /// `: comment` or keep-alive
    Comment(String),
    /// Any other field (`event:`, `id:`, `retry:`) or unknown text
    Field(String),
}

/// Parse a single SSE line into its component type.
pub fn parse_sse_line(line: &str) -> SseLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return SseLine::Empty;
    }

    if let Some(rest) = trimmed.strip_prefix("data:") {
        return SseLine::Data(rest.trim().to_string());
    }

    if let Some(rest) = trimmed.strip_prefix(':') {
        return SseLine::Comment(rest.trim().to_string());
    }

    SseLine::Field(trimmed.to_string())
}

/// Decode one line to a JSON payload, if it carries one.
pub fn decode_line(line: &str) -> Option<Value> {
    match parse_sse_line(line) {
        SseLine::Data(payload) => decode_payload(&payload),
        SseLine::Empty | SseLine::Comment(_) | SseLine::Field(_) => None,
    }
}

fn decode_payload(payload: &str) -> Option<Value> {
    if payload.is_empty() || payload == DONE_SENTINEL {
        return None;
    }

    match serde_json::from_str(payload) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, len = payload.len(), "Skipping malformed SSE payload");
            None
        }
    }
}

/// Splits body chunks into lines.
///
/// Bytes are buffered until a newline arrives, so a multi-byte character
/// split across two chunks is decoded intact.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
    /// Start of the first unread line
    consumed: usize,
    /// Everything before this offset is known to hold no newline
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a body chunk.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.consumed > 0 {
            self.pending.drain(..self.consumed);
            self.scanned -= self.consumed;
            self.consumed = 0;
        }
        self.pending.extend_from_slice(chunk);
    }

    /// Take the next complete line, without its `\n` or `\r\n` terminator.
    pub fn next_line(&mut self) -> Option<String> {
        let from = self.scanned.max(self.consumed);
        let Some(offset) = self.pending[from..].iter().position(|b| *b == b'\n') else {
            self.scanned = self.pending.len();
            return None;
        };
        let newline = from + offset;

        let mut line = &self.pending[self.consumed..newline];
        if line.last() == Some(&b'\r') {
            line = &line[..line.len() - 1];
        }
        let line = String::from_utf8_lossy(line).into_owned();

        self.consumed = newline + 1;
        self.scanned = self.consumed;
        if self.consumed == self.pending.len() {
            self.pending.clear();
            self.consumed = 0;
            self.scanned = 0;
        }
        Some(line)
    }

    /// Take whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.consumed >= self.pending.len() {
            self.pending.clear();
            self.consumed = 0;
            self.scanned = 0;
            return None;
        }
        let rest = String::from_utf8_lossy(&self.pending[self.consumed..])
            .trim_end_matches('\r')
            .to_string();
        self.pending.clear();
        self.consumed = 0;
        self.scanned = 0;
        Some(rest)
    }
}

/// Decode a response body into a stream of JSON payloads.
///
/// Dropping the returned stream drops `bytes`, which closes the connection.
pub fn decode_stream(bytes: ByteStream) -> PayloadStream {
    let payloads = stream::unfold(
        Some((bytes, LineBuffer::new())),
        |state| async move {
            let (mut bytes, mut buffer) = state?;
            loop {
                while let Some(line) = buffer.next_line() {
                    if let Some(payload) = decode_line(&line) {
                        return Some((Ok(payload), Some((bytes, buffer))));
                    }
                }

                match bytes.next().await {
                    Some(Ok(chunk)) => buffer.push(&chunk),
                    Some(Err(e)) => return Some((Err(e), None)),
                    None => {
                        // A final line may arrive without a trailing newline.
                        let payload = buffer.finish().and_then(|line| decode_line(&line))?;
                        return Some((Ok(payload), None));
                    }
                }
            }
        },
    );

    Box::pin(payloads)
}
