//! Batch runner
//!
//! Executes every item of a [`RunPlan`] through the [`MetricsEngine`]:
//! - Sequentially when concurrency is 1
//! - Otherwise as a bounded fan-out, with results restored to plan order

use chatbench_core::{ErrorKind, PlanItem, RequestResult, RequestSpec, RunPlan};
use chatbench_vendors::MetricsEngine;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tokio::sync::Semaphore;

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";

/// Progress bar for a plan of `len` attempts
pub fn progress_bar(len: usize, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    match ProgressStyle::default_bar().template(PROGRESS_TEMPLATE) {
        Ok(style) => pb.set_style(style.progress_chars("#>-")),
        Err(e) => tracing::debug!("Invalid progress template: {}", e),
    }
    pb
}

fn progress_message(item: &PlanItem, plan: &RunPlan) -> String {
    format!(
        "Prompt {}/{}, Run {}/{}",
        item.prompt_index + 1,
        plan.prompt_count(),
        item.run_index + 1,
        plan.runs()
    )
}

/// Runs a plan against one endpoint configuration
pub struct BenchmarkRunner {
    engine: MetricsEngine,
    template: RequestSpec,
    concurrency: usize,
}

impl BenchmarkRunner {
    /// Create a runner; `template` supplies everything but the prompt
    pub fn new(engine: MetricsEngine, template: RequestSpec, concurrency: usize) -> Self {
        Self {
            engine,
            template,
            concurrency: concurrency.max(1),
        }
    }

    fn spec_for(&self, item: &PlanItem) -> RequestSpec {
        RequestSpec {
            prompt: item.prompt.clone(),
            ..self.template.clone()
        }
    }

    /// Execute the whole plan; one result per item, in plan order
    pub async fn run(&self, plan: &RunPlan, progress: &ProgressBar) -> Vec<RequestResult> {
        tracing::info!(
            attempts = plan.len(),
            concurrency = self.concurrency,
            streaming = self.template.streaming,
            "Starting benchmark"
        );

        let results = if self.concurrency == 1 {
            self.run_sequential(plan, progress).await
        } else {
            self.run_concurrent(plan, progress).await
        };

        progress.finish_with_message("Benchmark complete");
        results
    }

    async fn run_sequential(&self, plan: &RunPlan, progress: &ProgressBar) -> Vec<RequestResult> {
        let mut results = Vec::with_capacity(plan.len());

        for item in plan.items() {
            progress.set_message(progress_message(&item, plan));
            let result = self.engine.execute(&self.spec_for(&item)).await;
            results.push(result);
            progress.inc(1);
        }

        results
    }

    async fn run_concurrent(&self, plan: &RunPlan, progress: &ProgressBar) -> Vec<RequestResult> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = Vec::with_capacity(plan.len());

        for item in plan.items() {
            let engine = self.engine.clone();
            let semaphore = semaphore.clone();
            let pb = progress.clone();
            let message = progress_message(&item, plan);
            let spec = self.spec_for(&item);

            let task = tokio::spawn(async move {
                // Limit in-flight attempts
                let _permit = semaphore.acquire_owned().await.ok();

                pb.set_message(message);
                let result = engine.execute(&spec).await;
                pb.inc(1);
                result
            });

            tasks.push((item, task));
        }

        // Join in spawn order, which is plan order
        let mut results = Vec::with_capacity(tasks.len());
        for (item, task) in tasks {
            match task.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!(index = item.index, "Request task failed: {}", e);
                    results.push(RequestResult::failure(
                        item.prompt,
                        ErrorKind::Transport,
                        format!("request task failed: {e}"),
                    ));
                }
            }
        }

        results
    }
}
