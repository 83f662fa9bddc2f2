//! JSON export functionality

use anyhow::{Context, Result};
use chatbench_core::{round2, ErrorKind, RequestResult, Stats, Summary};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Complete export document: summary plus one record per attempt
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    summary: SummaryRecord,
    results: Vec<ResultRecord<'a>>,
}

#[derive(Debug, Serialize)]
struct SummaryRecord {
    total_requests: usize,
    successful: usize,
    failed: usize,
    latency_stats: Option<Stats>,
    ttft_stats: Option<Stats>,
    ttfr_stats: Option<Stats>,
    output_tokens_stats: Option<Stats>,
    tps_stats: Option<Stats>,
}

#[derive(Debug, Serialize)]
struct ResultRecord<'a> {
    prompt: &'a str,
    status: &'static str,
    error_kind: Option<ErrorKind>,
    error_message: Option<&'a str>,
    response_content: Option<&'a str>,
    latency_ms: Option<f64>,
    ttft_ms: Option<f64>,
    ttfr_ms: Option<f64>,
    output_tokens: Option<usize>,
    tps: Option<f64>,
}

fn stats_block(stats: &Stats) -> Option<Stats> {
    (!stats.is_empty()).then(|| stats.rounded())
}

impl<'a> Report<'a> {
    /// Build the export document
    pub fn new(summary: &Summary, results: &'a [RequestResult]) -> Self {
        let summary = SummaryRecord {
            total_requests: summary.total_requests,
            successful: summary.successful,
            failed: summary.failed,
            latency_stats: stats_block(&summary.latency),
            ttft_stats: stats_block(&summary.ttft),
            ttfr_stats: stats_block(&summary.ttfr),
            output_tokens_stats: stats_block(&summary.output_tokens),
            tps_stats: stats_block(&summary.tps),
        };

        let results = results
            .iter()
            .map(|result| {
                let metrics = result.metrics();
                ResultRecord {
                    prompt: result.prompt(),
                    status: if result.is_success() { "success" } else { "error" },
                    error_kind: result.error_kind(),
                    error_message: result.error_message(),
                    response_content: metrics.map(|m| m.response_text.as_str()),
                    latency_ms: metrics.map(|m| round2(m.latency_ms)),
                    ttft_ms: metrics.and_then(|m| m.ttft_ms).map(round2),
                    ttfr_ms: metrics.and_then(|m| m.ttfr_ms).map(round2),
                    output_tokens: metrics.map(|m| m.output_tokens),
                    tps: metrics.map(|m| round2(m.tokens_per_second)),
                }
            })
            .collect();

        Self { summary, results }
    }
}

/// Writes [`Report`]s as pretty-printed UTF-8 JSON
pub struct JsonExporter;

impl JsonExporter {
    /// Render the report as a JSON string
    pub fn to_string(report: &Report<'_>) -> Result<String> {
        serde_json::to_string_pretty(report).context("Failed to serialize results")
    }

    /// Export the report to a file
    pub fn export(report: &Report<'_>, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, report)
            .with_context(|| format!("Failed to write JSON to: {}", path.display()))?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatbench_core::RequestMetrics;
    use serde_json::Value;

    fn results() -> Vec<RequestResult> {
        vec![
            RequestResult::success(
                "Explain TCP",
                RequestMetrics {
                    response_text: "TCP is...".into(),
                    latency_ms: 1150.123,
                    ttft_ms: Some(150.456),
                    ttfr_ms: None,
                    output_tokens: 30,
                    tokens_per_second: 30.0,
                },
            ),
            RequestResult::failure("Explain TCP", ErrorKind::Timeout, "request timed out after 120 s"),
        ]
    }

    fn to_value(results: &[RequestResult]) -> Value {
        let summary = Summary::from_results(results);
        let report = Report::new(&summary, results);
        serde_json::from_str(&JsonExporter::to_string(&report).unwrap()).unwrap()
    }

    #[test]
    fn test_summary_shape() {
        let value = to_value(&results());
        let summary = &value["summary"];

        assert_eq!(summary["total_requests"], 2);
        assert_eq!(summary["successful"], 1);
        assert_eq!(summary["failed"], 1);
        assert_eq!(summary["latency_stats"]["count"], 1);
        assert_eq!(summary["latency_stats"]["avg"], 1150.12);
        assert_eq!(summary["latency_stats"]["std"], 0.0);
        assert_eq!(summary["ttft_stats"]["min"], 150.46);
        assert!(summary["ttfr_stats"].is_null());
    }

    #[test]
    fn test_result_records() {
        let value = to_value(&results());
        let records = value["results"].as_array().unwrap();
        assert_eq!(records.len(), 2);

        let ok = &records[0];
        assert_eq!(ok["status"], "success");
        assert_eq!(ok["latency_ms"], 1150.12);
        assert_eq!(ok["ttft_ms"], 150.46);
        assert!(ok["ttfr_ms"].is_null());
        assert_eq!(ok["output_tokens"], 30);
        assert_eq!(ok["response_content"], "TCP is...");
        assert!(ok["error_message"].is_null());

        let failed = &records[1];
        assert_eq!(failed["status"], "error");
        assert_eq!(failed["error_kind"], "timeout");
        assert_eq!(failed["error_message"], "request timed out after 120 s");
        assert!(failed["latency_ms"].is_null());
        assert!(failed["output_tokens"].is_null());
        assert!(failed["response_content"].is_null());
    }

    #[test]
    fn test_all_failed_has_null_stats() {
        let results = vec![RequestResult::failure("p", ErrorKind::Transport, "refused")];
        let value = to_value(&results);
        assert!(value["summary"]["latency_stats"].is_null());
        assert!(value["summary"]["tps_stats"].is_null());
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let results = results();
        let summary = Summary::from_results(&results);

        JsonExporter::export(&Report::new(&summary, &results), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["summary"]["total_requests"], 2);
    }

    #[test]
    fn test_export_unicode_verbatim() {
        let results = vec![RequestResult::success(
            "你好",
            RequestMetrics {
                response_text: "世界".into(),
                latency_ms: 10.0,
                ttft_ms: None,
                ttfr_ms: None,
                output_tokens: 1,
                tokens_per_second: 100.0,
            },
        )];
        let summary = Summary::from_results(&results);
        let text = JsonExporter::to_string(&Report::new(&summary, &results)).unwrap();
        assert!(text.contains("你好"));
        assert!(text.contains("世界"));
    }
}
