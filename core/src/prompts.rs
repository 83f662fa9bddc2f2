//! Prompt loading and the batch request plan

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Where the batch prompts come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSource {
    /// A single prompt given inline
    Inline(String),
    /// A file with one prompt per line
    File(PathBuf),
}

impl PromptSource {
    /// Materialize the prompt list
    pub fn load(&self) -> Result<Vec<String>, ConfigError> {
        match self {
            PromptSource::Inline(prompt) => Ok(vec![prompt.clone()]),
            PromptSource::File(path) => load_prompt_file(path),
        }
    }
}

/// Parse prompt lines: trimmed, skipping blanks and `#` comments
pub fn parse_prompts(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read a prompt file; a file without prompts is an error
pub fn load_prompt_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let prompts = parse_prompts(&text);
    if prompts.is_empty() {
        return Err(ConfigError::EmptyPromptFile(path.to_path_buf()));
    }

    tracing::debug!(path = %path.display(), count = prompts.len(), "Loaded prompts");
    Ok(prompts)
}

/// One unit of work in a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanItem {
    /// Position in the plan (0-based)
    pub index: usize,
    /// Which prompt (0-based)
    pub prompt_index: usize,
    /// Which repetition of that prompt (0-based)
    pub run_index: usize,
    /// The prompt text
    pub prompt: String,
}

/// Prompts x runs, prompt-major
#[derive(Debug, Clone)]
pub struct RunPlan {
    prompts: Vec<String>,
    runs: usize,
}

impl RunPlan {
    /// Create a plan repeating every prompt `runs` times
    pub fn new(prompts: Vec<String>, runs: usize) -> Self {
        Self { prompts, runs }
    }

    /// Number of distinct prompts
    pub fn prompt_count(&self) -> usize {
        self.prompts.len()
    }

    /// Repetitions per prompt
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Total attempts in the plan
    pub fn len(&self) -> usize {
        self.prompts.len() * self.runs
    }

    /// Check if the plan has no work
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over plan items in dispatch order
    pub fn items(&self) -> impl Iterator<Item = PlanItem> + '_ {
        self.prompts
            .iter()
            .enumerate()
            .flat_map(move |(prompt_index, prompt)| {
                (0..self.runs).map(move |run_index| PlanItem {
                    index: prompt_index * self.runs + run_index,
                    prompt_index,
                    run_index,
                    prompt: prompt.clone(),
                })
            })
    }
}
