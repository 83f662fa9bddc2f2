//! Transport seam and its error type
//!
//! The timing engine only needs two things from the wire: a complete body
//! for buffered requests, or a sequence of raw lines stamped with their
//! arrival instant for streamed ones.

use std::pin::Pin;

use async_trait::async_trait;
use chatbench_core::{ErrorKind, RequestSpec};
use futures::Stream;
use thiserror::Error;
use tokio::time::Instant;

/// Number of body characters kept in HTTP status error messages.
pub const BODY_EXCERPT_CHARS: usize = 200;

/// One raw line of a streamed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedLine {
    /// Line text without the trailing newline
    pub text: String,
    /// When the line became available to the reader
    pub received_at: Instant,
}

impl TimedLine {
    /// Create a line stamped with the current instant.
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            received_at: Instant::now(),
        }
    }
}

/// Lines of a streamed response in arrival order.
pub type LineStream = Pin<Box<dyn Stream<Item = Result<TimedLine, TransportError>> + Send>>;

/// A complete 2xx response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw body text
    pub body: String,
}

/// One HTTP POST per request attempt.
///
/// Implementations return `TransportError::Status` for non-2xx responses so
/// that a returned body or stream always belongs to a successful response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and read the whole body.
    async fn send(
        &self,
        spec: &RequestSpec,
        body: &serde_json::Value,
    ) -> Result<BufferedResponse, TransportError>;

    /// Send the request and return its body as a stream of lines.
    async fn open_stream(
        &self,
        spec: &RequestSpec,
        body: &serde_json::Value,
    ) -> Result<LineStream, TransportError>;
}

/// Transport-level failure of one attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused, DNS or TLS failure
    #[error("connection failed: {0}")]
    Connect(String),

    /// The transport gave up waiting
    #[error("request timed out")]
    Timeout,

    /// Non-2xx response
    #[error("{message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Label, code and body excerpt
        message: String,
    },

    /// The connection failed while the body was being read
    #[error("stream interrupted: {0}")]
    Stream(String),

    /// A 2xx body that could not be decoded
    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

impl TransportError {
    /// Build a status error from a non-2xx response.
    pub fn from_status(status: u16, body: &str) -> Self {
        let excerpt: String = body.trim().chars().take(BODY_EXCERPT_CHARS).collect();
        let message = if excerpt.is_empty() {
            format!("{} (HTTP {})", status_label(status), status)
        } else {
            format!("{} (HTTP {}): {}", status_label(status), status, excerpt)
        };
        TransportError::Status { status, message }
    }

    /// Classification recorded in the failed result.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Connect(_) | TransportError::Stream(_) => ErrorKind::Transport,
            TransportError::Timeout => ErrorKind::Timeout,
            TransportError::Status { .. } => ErrorKind::HttpStatus,
            TransportError::InvalidBody(_) => ErrorKind::InvalidResponse,
        }
    }
}

/// Human-readable label for a non-2xx status code.
pub fn status_label(status: u16) -> &'static str {
    match status {
        401 => "authentication failed",
        403 => "permission denied",
        429 => "rate limited",
        s if s >= 500 => "server error",
        _ => "request failed",
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = error_chain(&err);
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_body() || err.is_decode() {
            TransportError::Stream(message)
        } else {
            TransportError::Connect(message)
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
