//! Per-request timing and result types

pub use crate::error::ErrorKind;

use crate::metrics::{duration_ms, tokens_per_second};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// A lifecycle instant that can be recorded at most once.
///
/// The first `record` wins; later calls leave the stored instant untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mark(Option<Instant>);

impl Mark {
    /// Record `at` if nothing was recorded yet. Returns true if this call stored it.
    pub fn record(&mut self, at: Instant) -> bool {
        if self.0.is_some() {
            return false;
        }
        self.0 = Some(at);
        true
    }

    /// The recorded instant, if any
    pub fn get(&self) -> Option<Instant> {
        self.0
    }

    /// Whether an instant has been recorded
    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

/// Monotonic instants captured during one request attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamps {
    start: Instant,
    first_content: Mark,
    first_reasoning: Mark,
    end: Mark,
}

impl Timestamps {
    /// Begin tracking an attempt that started at `start`
    pub fn new(start: Instant) -> Self {
        Self {
            start,
            first_content: Mark::default(),
            first_reasoning: Mark::default(),
            end: Mark::default(),
        }
    }

    /// Attempt start
    pub fn start(&self) -> Instant {
        self.start
    }

    /// Record the first content fragment (first write wins)
    pub fn mark_first_content(&mut self, at: Instant) -> bool {
        self.first_content.record(at)
    }

    /// Record the first reasoning fragment (first write wins)
    pub fn mark_first_reasoning(&mut self, at: Instant) -> bool {
        self.first_reasoning.record(at)
    }

    /// Record the end of the response (first write wins)
    pub fn mark_end(&mut self, at: Instant) -> bool {
        self.end.record(at)
    }

    /// Whether the end of the response has been recorded
    pub fn is_finished(&self) -> bool {
        self.end.is_set()
    }

    /// `end - start`, zero until the end is recorded
    pub fn latency(&self) -> Duration {
        self.since_start(self.end).unwrap_or_default()
    }

    /// `first_content - start`
    pub fn time_to_first_token(&self) -> Option<Duration> {
        self.since_start(self.first_content)
    }

    /// `first_reasoning - start`
    pub fn time_to_first_reasoning(&self) -> Option<Duration> {
        self.since_start(self.first_reasoning)
    }

    fn since_start(&self, mark: Mark) -> Option<Duration> {
        mark.get().map(|at| at.saturating_duration_since(self.start))
    }
}

/// How an attempt was executed, which decides the applicable metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingMode {
    /// Single buffered response; no TTFT or TTFR
    Buffered,
    /// Incremental response
    Streaming {
        /// Whether a reasoning-summary mode was requested
        reasoning_summary: bool,
    },
}

/// Metrics of one successful attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMetrics {
    /// Accumulated response text
    pub response_text: String,
    /// End-to-end latency in milliseconds
    pub latency_ms: f64,
    /// Time to first content token in milliseconds (streaming only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttft_ms: Option<f64>,
    /// Time to first reasoning fragment in milliseconds (streaming with reasoning summary only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttfr_ms: Option<f64>,
    /// Output token count, reported by the server or estimated locally
    pub output_tokens: usize,
    /// Generation-phase throughput
    pub tokens_per_second: f64,
}

impl RequestMetrics {
    /// Derive metrics from recorded instants.
    ///
    /// The end of the response must already be recorded; an unrecorded end
    /// is treated as zero latency.
    pub fn from_timestamps(
        response_text: String,
        timestamps: &Timestamps,
        mode: TimingMode,
        output_tokens: usize,
    ) -> Self {
        let latency_ms = duration_ms(timestamps.latency());
        let (ttft_ms, ttfr_ms) = match mode {
            TimingMode::Buffered => (None, None),
            TimingMode::Streaming { reasoning_summary } => (
                timestamps.time_to_first_token().map(duration_ms),
                timestamps
                    .time_to_first_reasoning()
                    .filter(|_| reasoning_summary)
                    .map(duration_ms),
            ),
        };

        Self {
            response_text,
            latency_ms,
            ttft_ms,
            ttfr_ms,
            output_tokens,
            tokens_per_second: tokens_per_second(output_tokens, latency_ms, ttft_ms),
        }
    }
}

/// Why an attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFailure {
    /// Failure classification
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
}

/// Outcome of one attempt: metrics on success, nothing but the error on failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The attempt completed
    Success(RequestMetrics),
    /// The attempt failed; no partial metrics survive
    Failure(RequestFailure),
}

/// Coarse status of an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Completed
    Success,
    /// Failed
    Failure,
}

/// Immutable record of one request attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestResult {
    prompt: String,
    outcome: Outcome,
}

impl RequestResult {
    /// A completed attempt
    pub fn success(prompt: impl Into<String>, metrics: RequestMetrics) -> Self {
        Self {
            prompt: prompt.into(),
            outcome: Outcome::Success(metrics),
        }
    }

    /// A failed attempt
    pub fn failure(prompt: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            outcome: Outcome::Failure(RequestFailure {
                kind,
                message: message.into(),
            }),
        }
    }

    /// Prompt text of the attempt
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Full outcome
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Coarse status
    pub fn status(&self) -> RequestStatus {
        match self.outcome {
            Outcome::Success(_) => RequestStatus::Success,
            Outcome::Failure(_) => RequestStatus::Failure,
        }
    }

    /// Check if the attempt succeeded
    pub fn is_success(&self) -> bool {
        self.status() == RequestStatus::Success
    }

    /// Metrics, present iff the attempt succeeded
    pub fn metrics(&self) -> Option<&RequestMetrics> {
        match &self.outcome {
            Outcome::Success(metrics) => Some(metrics),
            Outcome::Failure(_) => None,
        }
    }

    /// Failure details, present iff the attempt failed
    pub fn failure_info(&self) -> Option<&RequestFailure> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(failure) => Some(failure),
        }
    }

    /// Error message, present iff the attempt failed
    pub fn error_message(&self) -> Option<&str> {
        self.failure_info().map(|f| f.message.as_str())
    }

    /// Error kind, present iff the attempt failed
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.failure_info().map(|f| f.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(start: Instant, ms: u64) -> Instant {
        start + Duration::from_millis(ms)
    }

    #[test]
    fn test_mark_first_write_wins() {
        let start = Instant::now();
        let mut mark = Mark::default();
        assert!(!mark.is_set());
        assert!(mark.record(at(start, 10)));
        assert!(!mark.record(at(start, 20)));
        assert_eq!(mark.get(), Some(at(start, 10)));
    }

    #[test]
    fn test_timestamps_durations() {
        let start = Instant::now();
        let mut ts = Timestamps::new(start);
        assert_eq!(ts.latency(), Duration::ZERO);
        assert!(ts.time_to_first_token().is_none());

        ts.mark_first_reasoning(at(start, 80));
        ts.mark_first_content(at(start, 200));
        ts.mark_first_content(at(start, 300));
        ts.mark_end(at(start, 2200));

        assert!(ts.is_finished());
        assert_eq!(ts.time_to_first_reasoning(), Some(Duration::from_millis(80)));
        assert_eq!(ts.time_to_first_token(), Some(Duration::from_millis(200)));
        assert_eq!(ts.latency(), Duration::from_millis(2200));
    }

    #[test]
    fn test_buffered_metrics_have_no_ttft() {
        let start = Instant::now();
        let mut ts = Timestamps::new(start);
        ts.mark_first_content(at(start, 100));
        ts.mark_end(at(start, 1000));

        let metrics = RequestMetrics::from_timestamps("hi".into(), &ts, TimingMode::Buffered, 42);
        assert_eq!(metrics.latency_ms, 1000.0);
        assert!(metrics.ttft_ms.is_none());
        assert!(metrics.ttfr_ms.is_none());
        assert!((metrics.tokens_per_second - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_streaming_metrics_split_generation_phase() {
        let start = Instant::now();
        let mut ts = Timestamps::new(start);
        ts.mark_first_content(at(start, 150));
        ts.mark_end(at(start, 1150));

        let mode = TimingMode::Streaming {
            reasoning_summary: false,
        };
        let metrics = RequestMetrics::from_timestamps("x".into(), &ts, mode, 30);
        assert_eq!(metrics.ttft_ms, Some(150.0));
        assert_eq!(metrics.latency_ms, 1150.0);
        assert!((metrics.tokens_per_second - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_ttfr_requires_reasoning_summary() {
        let start = Instant::now();
        let mut ts = Timestamps::new(start);
        ts.mark_first_reasoning(at(start, 80));
        ts.mark_end(at(start, 500));

        let without = RequestMetrics::from_timestamps(
            String::new(),
            &ts,
            TimingMode::Streaming {
                reasoning_summary: false,
            },
            0,
        );
        assert!(without.ttfr_ms.is_none());

        let with = RequestMetrics::from_timestamps(
            String::new(),
            &ts,
            TimingMode::Streaming {
                reasoning_summary: true,
            },
            0,
        );
        assert_eq!(with.ttfr_ms, Some(80.0));
    }

    #[test]
    fn test_zero_generation_time_yields_zero_tps() {
        let start = Instant::now();
        let mut ts = Timestamps::new(start);
        ts.mark_first_content(at(start, 500));
        ts.mark_end(at(start, 500));

        let metrics = RequestMetrics::from_timestamps(
            "done".into(),
            &ts,
            TimingMode::Streaming {
                reasoning_summary: false,
            },
            12,
        );
        assert_eq!(metrics.tokens_per_second, 0.0);
    }

    #[test]
    fn test_result_accessors() {
        let ok = RequestResult::success(
            "p",
            RequestMetrics {
                response_text: "r".into(),
                latency_ms: 10.0,
                ttft_ms: None,
                ttfr_ms: None,
                output_tokens: 1,
                tokens_per_second: 100.0,
            },
        );
        assert!(ok.is_success());
        assert!(ok.error_message().is_none());
        assert!(ok.metrics().is_some());

        let failed = RequestResult::failure("p", ErrorKind::Timeout, "timed out");
        assert_eq!(failed.status(), RequestStatus::Failure);
        assert_eq!(failed.error_kind(), Some(ErrorKind::Timeout));
        assert_eq!(failed.error_message(), Some("timed out"));
        assert!(failed.metrics().is_none());
    }
}
