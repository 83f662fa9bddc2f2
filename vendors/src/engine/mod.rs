//! Timing & metrics engine
//!
//! Drives one request attempt end to end and turns it into exactly one
//! [`RequestResult`]. Every failure (transport, HTTP status, undecodable
//! body, timeout) is captured here; nothing propagates to the caller.
//!
//! # Lifecycle
//!
//! ```text
//!   start ──► send / open_stream ──► lines ... ──► [DONE] or close ──► end
//!                                     │
//!                                     ├─ first reasoning delta ─► first_reasoning
//!                                     └─ first content delta   ─► first_content
//! ```
//!
//! The whole lifecycle runs under a single `tokio::time::timeout` that
//! starts at `start`. When it fires the attempt future is dropped, so the
//! partial text and timestamps go with it.
//!
//! Fallback token counting happens after `end`, outside the timeout, on the
//! blocking pool so it never stalls other attempts sharing a worker.

use std::sync::Arc;

use chatbench_core::{
    CharEstimateCounter, ErrorKind, RequestMetrics, RequestResult, RequestSpec, StreamEvent,
    TimingMode, Timestamps, TokenCounter,
};
use futures::StreamExt;
use serde_json::Value;
use tokio::time::Instant;

use crate::body::{build_request_body, extract_buffered};
use crate::streaming::StreamInterpreter;
use crate::traits::{Transport, TransportError};


/// What one attempt observed before token accounting
struct Measured {
    text: String,
    timestamps: Timestamps,
    mode: TimingMode,
    reported_tokens: Option<usize>,
}

/// Executes request attempts and measures them.
#[derive(Clone)]
pub struct MetricsEngine {
    transport: Arc<dyn Transport>,
    counter: Arc<dyn TokenCounter>,
}

impl MetricsEngine {
    /// Create an engine over a transport and a fallback token counter.
    pub fn new(transport: Arc<dyn Transport>, counter: Arc<dyn TokenCounter>) -> Self {
        Self { transport, counter }
    }

    /// Execute one attempt. Never fails; errors become a failed result.
    pub async fn execute(&self, spec: &RequestSpec) -> RequestResult {
        let body = build_request_body(spec);

        let start = Instant::now();
        let attempt = async {
            if spec.streaming {
                self.run_streaming(spec, &body, start).await
            } else {
                self.run_buffered(spec, &body, start).await
            }
        };

        let measured = match tokio::time::timeout(spec.timeout, attempt).await {
            Ok(Ok(measured)) => measured,
            Ok(Err(err)) => {
                tracing::warn!(kind = %err.kind(), error = %err, "Request failed");
                return RequestResult::failure(spec.prompt.as_str(), err.kind(), err.to_string());
            }
            Err(_) => {
                let message = format!(
                    "request timed out after {} s",
                    spec.timeout.as_secs_f64()
                );
                tracing::warn!(kind = %ErrorKind::Timeout, "{}", message);
                return RequestResult::failure(spec.prompt.as_str(), ErrorKind::Timeout, message);
            }
        };

        let output_tokens = self
            .output_tokens(measured.reported_tokens, &measured.text, spec)
            .await;
        let metrics = RequestMetrics::from_timestamps(
            measured.text,
            &measured.timestamps,
            measured.mode,
            output_tokens,
        );

        tracing::debug!(
            latency_ms = metrics.latency_ms,
            ttft_ms = ?metrics.ttft_ms,
            ttfr_ms = ?metrics.ttfr_ms,
            output_tokens = metrics.output_tokens,
            "Request completed"
        );
        RequestResult::success(spec.prompt.as_str(), metrics)
    }

    async fn run_buffered(
        &self,
        spec: &RequestSpec,
        body: &Value,
        start: Instant,
    ) -> Result<Measured, TransportError> {
        let response = self.transport.send(spec, body).await?;
        let end = Instant::now();

        let content = extract_buffered(spec.dialect(), &response.body)?;

        let mut timestamps = Timestamps::new(start.into_std());
        timestamps.mark_end(end.into_std());

        Ok(Measured {
            text: content.text,
            timestamps,
            mode: TimingMode::Buffered,
            reported_tokens: content.completion_tokens,
        })
    }

    async fn run_streaming(
        &self,
        spec: &RequestSpec,
        body: &Value,
        start: Instant,
    ) -> Result<Measured, TransportError> {
        let mut lines = self.transport.open_stream(spec, body).await?;

        let mut interpreter = StreamInterpreter::new();
        let mut timestamps = Timestamps::new(start.into_std());
        let mut text = String::new();
        let mut reported_tokens = None;

        while let Some(line) = lines.next().await {
            let line = line?;
            let at = line.received_at.into_std();

            for event in interpreter.interpret(&line.text) {
                match event {
                    StreamEvent::ContentDelta { text: fragment } => {
                        timestamps.mark_first_content(at);
                        text.push_str(&fragment);
                    }
                    StreamEvent::ReasoningDelta { .. } => {
                        timestamps.mark_first_reasoning(at);
                    }
                    StreamEvent::UsageReported { completion_tokens } => {
                        reported_tokens = Some(completion_tokens);
                    }
                    StreamEvent::StreamEnd => {
                        timestamps.mark_end(at);
                    }
                }
            }

            if interpreter.is_finished() {
                break;
            }
        }

        if !timestamps.is_finished() {
            tracing::debug!("Stream closed without terminator");
            timestamps.mark_end(Instant::now().into_std());
        }

        Ok(Measured {
            text,
            timestamps,
            mode: TimingMode::Streaming {
                reasoning_summary: spec.tracks_reasoning(),
            },
            reported_tokens,
        })
    }

    /// Server-reported count, or a local estimate when it is missing.
    ///
    /// A reported zero for a non-empty response is treated as missing.
    async fn output_tokens(
        &self,
        reported: Option<usize>,
        text: &str,
        spec: &RequestSpec,
    ) -> usize {
        match reported {
            Some(tokens) if tokens > 0 || text.is_empty() => tokens,
            _ => {
                tracing::debug!(model = %spec.model, "No usage reported, counting tokens locally");
                let counter = self.counter.clone();
                let model = spec.model.clone();
                let sample = text.to_string();
                match tokio::task::spawn_blocking(move || counter.count(&sample, &model)).await {
                    Ok(tokens) => tokens,
                    Err(e) => {
                        tracing::warn!("Token counting task failed, estimating: {}", e);
                        CharEstimateCounter.count(text, &spec.model)
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for MetricsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsEngine").finish_non_exhaustive()
    }
}
