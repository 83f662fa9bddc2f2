//! Metric formulas and batch aggregation
//!
//! Aggregation is a pure fold over the multiset of per-request values:
//! values are sorted before summing, so the output for a given set of
//! results does not depend on the order they completed in.

use crate::response::RequestResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Convert a duration to fractional milliseconds
pub fn duration_ms(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

/// Generation-phase throughput.
///
/// With a TTFT the divisor is the time after the first token, otherwise the
/// whole latency. A non-positive divisor yields 0.0.
pub fn tokens_per_second(output_tokens: usize, latency_ms: f64, ttft_ms: Option<f64>) -> f64 {
    let window_ms = match ttft_ms {
        Some(ttft) => latency_ms - ttft,
        None => latency_ms,
    };
    if window_ms <= 0.0 {
        return 0.0;
    }
    output_tokens as f64 / (window_ms / 1000.0)
}

/// Round to two decimal places for presentation
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Distribution of one metric over a set of successful results
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Number of samples
    pub count: usize,
    /// Arithmetic mean
    pub avg: f64,
    /// Sample standard deviation (0 when count <= 1)
    pub std: f64,
    /// Smallest sample
    pub min: f64,
    /// Largest sample
    pub max: f64,
}

impl Stats {
    /// Compute stats over `values`; an empty slice gives count 0 and zeroes
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let avg = sorted.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let squares: f64 = sorted.iter().map(|v| (v - avg).powi(2)).sum();
            (squares / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        Self {
            count,
            avg,
            std,
            min: sorted[0],
            max: sorted[count - 1],
        }
    }

    /// Whether no samples contributed
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Copy with every value rounded to two decimals
    pub fn rounded(&self) -> Self {
        Self {
            count: self.count,
            avg: round2(self.avg),
            std: round2(self.std),
            min: round2(self.min),
            max: round2(self.max),
        }
    }
}

/// Batch summary: counts plus one [`Stats`] per metric
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// All attempts
    pub total_requests: usize,
    /// Successful attempts
    pub successful: usize,
    /// Failed attempts
    pub failed: usize,
    /// End-to-end latency (ms)
    pub latency: Stats,
    /// Time to first token (ms), over results that recorded one
    pub ttft: Stats,
    /// Time to first reasoning fragment (ms), over results that recorded one
    pub ttfr: Stats,
    /// Output tokens
    pub output_tokens: Stats,
    /// Tokens per second
    pub tps: Stats,
}

impl Summary {
    /// Fold a set of results into a summary
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a RequestResult>,
    {
        let mut total_requests = 0;
        let mut latency = Vec::new();
        let mut ttft = Vec::new();
        let mut ttfr = Vec::new();
        let mut output_tokens = Vec::new();
        let mut tps = Vec::new();

        for result in results {
            total_requests += 1;
            let Some(metrics) = result.metrics() else {
                continue;
            };
            latency.push(metrics.latency_ms);
            ttft.extend(metrics.ttft_ms);
            ttfr.extend(metrics.ttfr_ms);
            output_tokens.push(metrics.output_tokens as f64);
            tps.push(metrics.tokens_per_second);
        }

        let successful = latency.len();
        Self {
            total_requests,
            successful,
            failed: total_requests - successful,
            latency: Stats::from_values(&latency),
            ttft: Stats::from_values(&ttft),
            ttfr: Stats::from_values(&ttfr),
            output_tokens: Stats::from_values(&output_tokens),
            tps: Stats::from_values(&tps),
        }
    }

    /// Success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.successful as f64 / self.total_requests as f64
        }
    }

    /// Whether any attempt failed
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Summaries grouped by prompt, in order of first appearance
pub fn summarize_by_prompt(results: &[RequestResult]) -> Vec<(String, Summary)> {
    let mut prompts: Vec<&str> = Vec::new();
    for result in results {
        if !prompts.contains(&result.prompt()) {
            prompts.push(result.prompt());
        }
    }

    prompts
        .into_iter()
        .map(|prompt| {
            let summary =
                Summary::from_results(results.iter().filter(|r| r.prompt() == prompt));
            (prompt.to_string(), summary)
        })
        .collect()
}
