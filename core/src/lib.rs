//! chatbench-core: Core data structures for benchmarking chat APIs
//!
//! This crate provides the protocol-independent types used across chatbench:
//!
//! - Request types and configuration resolution
//! - Stream events produced by response interpreters
//! - Per-attempt timing, metrics and results
//! - Batch aggregation
//! - The token counting seam
//! - Error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod prompts;
pub mod request;
pub mod response;
pub mod token;

pub use config::*;
pub use error::*;
pub use event::*;
pub use metrics::*;
pub use prompts::*;
pub use request::*;
pub use response::*;
pub use token::*;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::time::{Duration, Instant};

    // =========================================================================
    // Serialization format tests
    // =========================================================================

    #[test]
    fn test_error_kind_snake_case_serialization() {
        for kind in [
            ErrorKind::Transport,
            ErrorKind::Timeout,
            ErrorKind::HttpStatus,
            ErrorKind::InvalidResponse,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            let back: ErrorKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn test_metrics_skip_absent_timings() {
        let metrics = RequestMetrics {
            response_text: "hi".into(),
            latency_ms: 12.5,
            ttft_ms: None,
            ttfr_ms: None,
            output_tokens: 2,
            tokens_per_second: 160.0,
        };
        let json = serde_json::to_string(&metrics).unwrap();
        assert!(!json.contains("ttft_ms"));
        assert!(!json.contains("ttfr_ms"));
        assert!(json.contains("\"latency_ms\":12.5"));
    }

    // =========================================================================
    // End-to-end: timestamps -> results -> summary
    // =========================================================================

    #[test]
    fn test_streamed_attempts_fold_into_summary() {
        let start = Instant::now();
        let mode = TimingMode::Streaming {
            reasoning_summary: false,
        };

        let results: Vec<RequestResult> = [(150u64, 1150u64, 30usize), (250, 1250, 60)]
            .into_iter()
            .map(|(ttft, end, tokens)| {
                let mut ts = Timestamps::new(start);
                ts.mark_first_content(start + Duration::from_millis(ttft));
                ts.mark_end(start + Duration::from_millis(end));
                RequestResult::success(
                    "Explain",
                    RequestMetrics::from_timestamps("x".into(), &ts, mode, tokens),
                )
            })
            .chain(std::iter::once(RequestResult::failure(
                "Explain",
                ErrorKind::HttpStatus,
                "rate limited (HTTP 429)",
            )))
            .collect();

        let summary = Summary::from_results(&results);
        assert_eq!(summary.total_requests, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.ttft.count, 2);
        assert_eq!(summary.ttft.avg, 200.0);
        assert_eq!(summary.latency.avg, 1200.0);
        // 30 tok / 1 s and 60 tok / 1 s
        assert_eq!(summary.tps.avg, 45.0);
    }

    #[test]
    fn test_config_to_request_spec_dialect() {
        let cli = Settings {
            endpoint: Some("https://example.openai.azure.com/openai/v1/responses".into()),
            model: Some("o4-mini".into()),
            prompt: Some("Hi".into()),
            ..Default::default()
        };
        let config = BenchConfig::resolve(cli, None, None).unwrap();
        assert_eq!(config.request_spec("Hi").dialect(), ApiDialect::Responses);
    }
}
