//! Server-sent event decoding and interpretation.
//!
//! Bytes from the network are split into lines by [`LineDecoder`]; each line
//! is then turned into zero or more [`StreamEvent`]s by
//! [`StreamInterpreter`].
//!
//! # Skip policy
//!
//! Providers emit keep-alive comments, role-only preambles and the odd
//! non-JSON line. None of these are errors: any line that is empty, is not a
//! `data:` line, fails to parse, or carries no recognized payload produces
//! no events and interpretation continues.
//!
//! # SSE Format
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hello"}}]}
//!
//! data: {"choices":[],"usage":{"completion_tokens":12}}
//!
//! data: [DONE]
//! ```

use chatbench_core::StreamEvent;
use serde_json::Value;

use crate::body::usage_completion_tokens;

// ============================================================================
// Line Decoder
// ============================================================================

/// Maximum buffer size (1MB) to prevent unbounded memory growth from malformed streams.
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Terminator payload of OpenAI-style streams.
const DONE_MARKER: &str = "[DONE]";

/// Splits a byte stream into text lines.
///
/// Bytes are buffered until a `\n` arrives, so multi-byte characters split
/// across network chunks decode correctly. A trailing `\r` is stripped and
/// invalid UTF-8 is replaced rather than rejected.
///
/// # Buffer Limits
///
/// A line that grows past 1MB without a newline is discarded up to the most
/// recent byte and a warning is logged once per overflow.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    truncated: bool,
}

impl LineDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return every line they complete.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            lines.push(decode_line(&raw[..raw.len() - 1]));
            self.truncated = false;
        }

        if self.buffer.len() > MAX_BUFFER_SIZE {
            if !self.truncated {
                tracing::warn!(
                    "SSE line exceeded {} bytes without a newline, discarding. This may indicate a malformed stream.",
                    MAX_BUFFER_SIZE
                );
                self.truncated = true;
            }
            self.buffer.clear();
        }

        lines
    }

    /// Flush the final line if the stream closed without a newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buffer);
        Some(decode_line(&raw))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

// ============================================================================
// Stream Interpreter
// ============================================================================

/// Turns raw SSE lines into typed stream events.
///
/// Events come out in the order their lines went in. Within one chunk the
/// order is reasoning, content, usage. After the terminator every further
/// line is ignored.
#[derive(Debug, Default)]
pub struct StreamInterpreter {
    finished: bool,
}

impl StreamInterpreter {
    /// Create an interpreter awaiting the first line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the terminator has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Interpret one line.
    pub fn interpret(&mut self, line: &str) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }

        let Some(payload) = data_payload(line) else {
            return Vec::new();
        };

        if payload == DONE_MARKER {
            self.finished = true;
            return vec![StreamEvent::StreamEnd];
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(chunk) => chunk_events(&chunk),
            Err(err) => {
                tracing::debug!(error = %err, "Skipping malformed stream chunk");
                Vec::new()
            }
        }
    }
}

/// Payload of a `data:` line, trimmed. Other SSE fields yield `None`.
fn data_payload(line: &str) -> Option<&str> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() {
        None
    } else {
        Some(payload)
    }
}

fn chunk_events(chunk: &Value) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    if let Some(text) = extract_reasoning(chunk) {
        events.push(StreamEvent::reasoning(text));
    }
    if let Some(text) = extract_content(chunk) {
        events.push(StreamEvent::content(text));
    }
    if let Some(completion_tokens) = extract_usage(chunk) {
        events.push(StreamEvent::UsageReported { completion_tokens });
    }

    events
}

// ============================================================================
// JSON Chunk Parsing Helpers
// ============================================================================

const OUTPUT_TEXT_DELTA: &str = "response.output_text.delta";
const REASONING_DELTA_TYPES: &[&str] = &[
    "response.reasoning_summary_text.delta",
    "response.reasoning_text.delta",
    "response.reasoning.delta",
];
const RESPONSE_COMPLETED: &str = "response.completed";

fn event_type(chunk: &Value) -> Option<&str> {
    chunk.get("type").and_then(Value::as_str)
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Content from `choices[0].delta.content` or an output-text delta event.
fn extract_content(chunk: &Value) -> Option<String> {
    if event_type(chunk) == Some(OUTPUT_TEXT_DELTA) {
        return non_empty(chunk.get("delta"));
    }
    non_empty(chunk.pointer("/choices/0/delta/content"))
}

/// Reasoning from a summary/raw reasoning delta event, or a chat delta.
fn extract_reasoning(chunk: &Value) -> Option<String> {
    if let Some(kind) = event_type(chunk) {
        if REASONING_DELTA_TYPES.contains(&kind) {
            return non_empty(chunk.get("delta")).or_else(|| non_empty(chunk.get("text")));
        }
    }

    let delta = chunk.pointer("/choices/0/delta")?;
    non_empty(delta.get("reasoning_content")).or_else(|| non_empty(delta.get("reasoning")))
}

/// Completion tokens from a top-level usage object or a completed-response event.
fn extract_usage(chunk: &Value) -> Option<usize> {
    if event_type(chunk) == Some(RESPONSE_COMPLETED) {
        return chunk.pointer("/response/usage").and_then(usage_completion_tokens);
    }
    chunk.get("usage").and_then(usage_completion_tokens)
}

// ============================================================================
// Tests
// ============================================================================
