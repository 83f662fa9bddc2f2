//! Endpoint-facing side of chatbench
//!
//! This crate speaks to OpenAI-compatible endpoints:
//!
//! - Request bodies for the Chat Completions and Responses dialects
//! - SSE line decoding and stream interpretation
//! - The `Transport` seam and its reqwest implementation
//! - tiktoken-backed token counting
//! - The timing engine that turns one attempt into one result

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod body;
pub mod engine;
pub mod http;
pub mod streaming;
pub mod tokenizer;
pub mod traits;

pub use body::{build_request_body, extract_buffered, BufferedContent};
pub use engine::MetricsEngine;
pub use http::{HttpConfig, HttpTransport};
pub use streaming::{LineDecoder, StreamInterpreter};
pub use tokenizer::TiktokenCounter;
pub use traits::{
    status_label, BufferedResponse, LineStream, TimedLine, Transport, TransportError,
};
