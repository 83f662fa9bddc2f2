//! Plain-text tables for terminal output

use chatbench_core::{BenchConfig, RequestResult, Stats, Summary};
use std::fmt::Write;

const PROMPT_PREVIEW_CHARS: usize = 30;
const RULE_WIDTH: usize = 70;

fn rule(c: char) -> String {
    std::iter::repeat(c).take(RULE_WIDTH).collect()
}

fn preview(prompt: &str) -> String {
    let flat: String = prompt
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    if flat.chars().count() > PROMPT_PREVIEW_CHARS {
        let head: String = flat.chars().take(PROMPT_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        flat
    }
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn format_row<'a>(values: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    values
        .zip(widths)
        .map(|(value, width)| {
            let pad = width.saturating_sub(value.chars().count());
            format!("{value}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Header describing the run about to start
pub fn render_banner(config: &BenchConfig, prompt_count: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule('='));
    let _ = writeln!(out, "chatbench");
    let _ = writeln!(out, "{}", rule('='));
    if let Some(path) = &config.config_file {
        let _ = writeln!(out, "Config file:  {}", path.display());
    }
    let _ = writeln!(out, "Endpoint:     {}", config.endpoint);
    let _ = writeln!(out, "Model:        {}", config.model);
    let _ = writeln!(out, "Mode:         {}", if config.streaming { "streaming" } else { "buffered" });
    let _ = writeln!(out, "Prompts:      {prompt_count}");
    let _ = writeln!(out, "Runs:         {}", config.runs);
    let _ = writeln!(out, "Concurrency:  {}", config.concurrency);
    let _ = writeln!(out, "Timeout:      {} s", config.timeout.as_secs_f64());
    if let Some(effort) = config.reasoning_effort {
        let _ = writeln!(out, "Reasoning:    {}", effort.as_str());
    }
    if let Some(summary) = config.reasoning_summary {
        let _ = writeln!(out, "Summary:      {}", summary.as_str());
    }
    if let Some(max) = config.max_tokens {
        let _ = writeln!(out, "Max tokens:   {max}");
    }
    let _ = write!(out, "{}", rule('='));
    out
}

/// One row per attempt; failures show `-` in every metric column
pub fn render_results(results: &[RequestResult], streaming: bool) -> String {
    let show_ttfr = results
        .iter()
        .filter_map(|r| r.metrics())
        .any(|m| m.ttfr_ms.is_some());

    let mut header = vec!["#", "Prompt", "Status", "Latency (ms)"];
    if streaming {
        header.push("TTFT (ms)");
    }
    if show_ttfr {
        header.push("TTFR (ms)");
    }
    header.extend(["Output tokens", "TPS"]);

    let rows: Vec<Vec<String>> = results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let metrics = result.metrics();
            let status = match result.error_kind() {
                None => "ok".to_string(),
                Some(kind) => kind.to_string(),
            };
            let mut row = vec![
                (i + 1).to_string(),
                preview(result.prompt()),
                status,
                cell(metrics.map(|m| m.latency_ms)),
            ];
            if streaming {
                row.push(cell(metrics.and_then(|m| m.ttft_ms)));
            }
            if show_ttfr {
                row.push(cell(metrics.and_then(|m| m.ttfr_ms)));
            }
            row.push(metrics.map_or_else(|| "-".to_string(), |m| m.output_tokens.to_string()));
            row.push(cell(metrics.map(|m| m.tokens_per_second)));
            row
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(value.chars().count());
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", format_row(header.iter().copied(), &widths));
    let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    let _ = writeln!(out, "{}", "-".repeat(total));
    for row in &rows {
        let _ = writeln!(out, "{}", format_row(row.iter().map(String::as_str), &widths));
    }

    let failures: Vec<(usize, &str)> = results
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.error_message().map(|m| (i + 1, m)))
        .collect();
    if !failures.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Errors:");
        for (index, message) in failures {
            let _ = writeln!(out, "  #{index}: {message}");
        }
    }

    out.trim_end().to_string()
}

fn stats_line(stats: &Stats, unit: &str) -> String {
    if stats.is_empty() {
        return "-".to_string();
    }
    let s = stats.rounded();
    format!(
        "avg {}{unit} | std {}{unit} | [{}, {}]{unit}",
        s.avg, s.std, s.min, s.max
    )
}

/// Counts plus one `avg | std | [min, max]` line per metric
pub fn render_summary(title: &str, summary: &Summary, streaming: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule('-'));
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", rule('-'));
    let _ = writeln!(out, "  Total requests: {}", summary.total_requests);
    let _ = writeln!(out, "  Successful:     {}", summary.successful);
    let _ = writeln!(out, "  Failed:         {}", summary.failed);
    let _ = writeln!(out, "  Success rate:   {:.1}%", summary.success_rate() * 100.0);

    if summary.successful > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "  Latency:        {}", stats_line(&summary.latency, " ms"));
        if streaming {
            let _ = writeln!(out, "  TTFT:           {}", stats_line(&summary.ttft, " ms"));
        }
        if !summary.ttfr.is_empty() {
            let _ = writeln!(out, "  TTFR:           {}", stats_line(&summary.ttfr, " ms"));
        }
        let _ = writeln!(out, "  Output tokens:  {}", stats_line(&summary.output_tokens, ""));
        let _ = writeln!(out, "  TPS:            {}", stats_line(&summary.tps, ""));
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatbench_core::{ErrorKind, RequestMetrics};

    fn ok(prompt: &str, latency_ms: f64, ttft_ms: Option<f64>, tokens: usize) -> RequestResult {
        RequestResult::success(
            prompt,
            RequestMetrics {
                response_text: "answer".into(),
                latency_ms,
                ttft_ms,
                ttfr_ms: None,
                output_tokens: tokens,
                tokens_per_second: 42.0,
            },
        )
    }

    #[test]
    fn test_preview_truncates_long_prompts() {
        assert_eq!(preview("short"), "short");
        let long = "a".repeat(40);
        assert_eq!(preview(&long), format!("{}...", "a".repeat(30)));
        assert_eq!(preview("line one\nline two"), "line one line two");
    }

    #[test]
    fn test_results_table_streaming_columns() {
        let results = vec![
            ok("Explain TCP", 1150.0, Some(150.0), 30),
            RequestResult::failure("Explain TCP", ErrorKind::Timeout, "request timed out after 1 s"),
        ];
        let table = render_results(&results, true);
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].contains("TTFT (ms)"));
        assert!(!lines[0].contains("TTFR"));
        assert!(lines[2].contains("1150.00"));
        assert!(lines[2].contains("150.00"));
        assert!(lines[3].contains("timeout"));
        assert!(lines[3].contains('-'));
        assert!(table.contains("#2: request timed out after 1 s"));
    }

    #[test]
    fn test_results_table_buffered_has_no_ttft() {
        let results = vec![ok("p", 1000.0, None, 42)];
        let table = render_results(&results, false);
        assert!(!table.contains("TTFT"));
        assert!(!table.contains("Errors:"));
    }

    #[test]
    fn test_summary_lines() {
        let results = vec![ok("p", 1000.0, Some(100.0), 10), ok("p", 2000.0, Some(300.0), 20)];
        let summary = Summary::from_results(&results);
        let text = render_summary("Summary", &summary, true);

        assert!(text.contains("Total requests: 2"));
        assert!(text.contains("Success rate:   100.0%"));
        assert!(text.contains("Latency:        avg 1500 ms"));
        assert!(text.contains("[1000, 2000] ms"));
        assert!(text.contains("TTFT:           avg 200 ms"));
        assert!(!text.contains("TTFR"));
    }

    #[test]
    fn test_summary_all_failed_omits_metrics() {
        let results = vec![RequestResult::failure("p", ErrorKind::Transport, "refused")];
        let summary = Summary::from_results(&results);
        let text = render_summary("Summary", &summary, false);
        assert!(text.contains("Failed:         1"));
        assert!(text.contains("Success rate:   0.0%"));
        assert!(!text.contains("Latency"));
    }
}
