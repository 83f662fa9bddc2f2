//! CLI argument parsing and command handling

use crate::output::{render_banner, render_results, render_summary, JsonExporter, Report};
use crate::runner::{progress_bar, BenchmarkRunner};
use anyhow::{Context, Result};
use chatbench_core::{
    summarize_by_prompt, BenchConfig, FileSettings, ReasoningEffort, ReasoningSummary, RunPlan,
    Settings, Summary, API_KEY_ENV,
};
use chatbench_vendors::{HttpConfig, HttpTransport, MetricsEngine, TiktokenCounter};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

/// chatbench - latency and throughput benchmarking for OpenAI-compatible chat APIs
#[derive(Parser, Debug)]
#[command(name = "chatbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Endpoint URL (chat/completions or responses)
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// API key (falls back to the config file, then LLM_API_KEY)
    #[arg(short = 'k', long)]
    pub api_key: Option<String>,

    /// Model name
    #[arg(short, long)]
    pub model: Option<String>,

    /// Prompt to send
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// File with one prompt per line
    #[arg(short = 'f', long)]
    pub prompt_file: Option<PathBuf>,

    /// Consume the response as a stream (required for TTFT)
    #[arg(short, long)]
    pub streaming: bool,

    /// Runs per prompt
    #[arg(short, long)]
    pub runs: Option<usize>,

    /// Per-attempt timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Write the JSON report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the JSON report to stdout instead of tables
    #[arg(long = "json")]
    pub json_output: bool,

    /// Reasoning effort (low, medium, high)
    #[arg(long)]
    pub reasoning_effort: Option<ReasoningEffort>,

    /// Reasoning summary (auto, detailed, concise)
    #[arg(long)]
    pub reasoning_summary: Option<ReasoningSummary>,

    /// Maximum output tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Ask the provider not to store the response
    #[arg(long)]
    pub no_cache: bool,

    /// Concurrent requests in flight
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// CLI layer of the settings merge; unset flags leave lower layers in charge
    pub fn to_settings(&self) -> Settings {
        Settings {
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            prompt: self.prompt.clone(),
            prompt_file: self.prompt_file.clone(),
            streaming: self.streaming.then_some(true),
            runs: self.runs,
            timeout: self.timeout,
            output: self.output.clone(),
            json_output: self.json_output.then_some(true),
            reasoning_effort: self.reasoning_effort,
            reasoning_summary: self.reasoning_summary,
            max_tokens: self.max_tokens,
            no_cache: self.no_cache.then_some(true),
            concurrency: self.concurrency,
        }
    }

    /// Resolve configuration and build everything needed to run.
    ///
    /// Errors here are usage errors; nothing has been sent yet.
    pub fn prepare(&self) -> Result<Benchmark> {
        let file = FileSettings::discover(self.config.as_deref())?;
        if let Some(loaded) = &file {
            tracing::debug!(path = %loaded.path.display(), "Using config file");
        }

        let env_key = std::env::var(API_KEY_ENV).ok();
        let config = BenchConfig::resolve(self.to_settings(), file, env_key)?;

        let prompts = config
            .prompts
            .load()
            .context("Failed to load prompts")?;
        let plan = RunPlan::new(prompts, config.runs);

        let http = HttpConfig::default().with_pool_max_idle(config.concurrency);
        let transport = HttpTransport::new(&http).context("Failed to build HTTP client")?;
        // Build the fallback encoder now, before any attempt is timed
        let counter = TiktokenCounter::for_model(&config.model);
        let engine = MetricsEngine::new(Arc::new(transport), Arc::new(counter));
        let runner = BenchmarkRunner::new(engine, config.request_spec(""), config.concurrency);

        Ok(Benchmark {
            config,
            plan,
            runner,
        })
    }
}

/// A fully-resolved batch, ready to execute
pub struct Benchmark {
    config: BenchConfig,
    plan: RunPlan,
    runner: BenchmarkRunner,
}

impl Benchmark {
    /// Execute the batch, render it and export it.
    ///
    /// Returns whether any attempt failed.
    pub async fn run(&self) -> Result<bool> {
        let json = self.config.json_output;

        if !json {
            println!("{}", render_banner(&self.config, self.plan.prompt_count()));
            println!();
        }

        let progress = progress_bar(self.plan.len(), json);
        let results = self.runner.run(&self.plan, &progress).await;
        let summary = Summary::from_results(&results);

        tracing::info!(
            total = summary.total_requests,
            successful = summary.successful,
            failed = summary.failed,
            "Benchmark finished"
        );

        let report = Report::new(&summary, &results);
        if json {
            println!("{}", JsonExporter::to_string(&report)?);
        } else {
            let streaming = self.config.streaming;
            println!();
            println!("{}", render_results(&results, streaming));
            println!();
            println!("{}", render_summary("Summary", &summary, streaming));

            if self.plan.prompt_count() > 1 {
                for (i, (_, prompt_summary)) in summarize_by_prompt(&results).iter().enumerate() {
                    println!();
                    let title = format!("Prompt {}/{}", i + 1, self.plan.prompt_count());
                    println!("{}", render_summary(&title, prompt_summary, streaming));
                }
            }
        }

        if let Some(path) = &self.config.output {
            JsonExporter::export(&report, path)?;
            if json {
                tracing::info!(path = %path.display(), "Results saved");
            } else {
                println!();
                println!("Results saved to: {}", path.display());
            }
        }

        Ok(summary.has_failures())
    }
}
