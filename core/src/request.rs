//! Request types: dialects, reasoning options and the resolved request

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Default per-attempt timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Reasoning effort hint for reasoning-capable models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    /// Minimal reasoning
    Low,
    /// Balanced reasoning
    Medium,
    /// Maximum reasoning
    High,
}

impl ReasoningEffort {
    /// Wire value of this effort level
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

impl FromStr for ReasoningEffort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(ReasoningEffort::Low),
            "medium" => Ok(ReasoningEffort::Medium),
            "high" => Ok(ReasoningEffort::High),
            _ => Err(format!(
                "unknown reasoning effort `{}` (expected low, medium or high)",
                s
            )),
        }
    }
}

impl std::fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasoning-summary mode; when set, providers may stream reasoning fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningSummary {
    /// Provider picks the summary granularity
    Auto,
    /// Detailed summaries
    Detailed,
    /// Short summaries
    Concise,
}

impl ReasoningSummary {
    /// Wire value of this summary mode
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningSummary::Auto => "auto",
            ReasoningSummary::Detailed => "detailed",
            ReasoningSummary::Concise => "concise",
        }
    }
}

impl FromStr for ReasoningSummary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ReasoningSummary::Auto),
            "detailed" => Ok(ReasoningSummary::Detailed),
            "concise" => Ok(ReasoningSummary::Concise),
            _ => Err(format!(
                "unknown reasoning summary `{}` (expected auto, detailed or concise)",
                s
            )),
        }
    }
}

impl std::fmt::Display for ReasoningSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire dialect spoken by the configured endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiDialect {
    /// `/v1/chat/completions` style
    ChatCompletions,
    /// `/v1/responses` style (Azure OpenAI and newer OpenAI deployments)
    Responses,
}

impl ApiDialect {
    /// Detect the dialect from an endpoint URL
    pub fn detect(endpoint: &str) -> Self {
        if endpoint.contains("/responses") {
            ApiDialect::Responses
        } else {
            ApiDialect::ChatCompletions
        }
    }
}

/// One fully-resolved request: built once before dispatch and never mutated
#[derive(Clone, PartialEq)]
pub struct RequestSpec {
    /// Endpoint URL the request is POSTed to
    pub endpoint: String,
    /// Bearer credential, if any
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Prompt text sent as the single user message
    pub prompt: String,
    /// Whether the response is consumed incrementally
    pub streaming: bool,
    /// Wall-clock budget for the whole attempt
    pub timeout: Duration,
    /// Optional reasoning effort
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Optional reasoning-summary mode
    pub reasoning_summary: Option<ReasoningSummary>,
    /// Optional cap on output tokens
    pub max_output_tokens: Option<u32>,
    /// Ask the provider not to store or reuse the response
    pub no_cache: bool,
}

impl RequestSpec {
    /// Create a non-streaming spec with default timeout and no optional parameters
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            model: model.into(),
            prompt: prompt.into(),
            streaming: false,
            timeout: DEFAULT_TIMEOUT,
            reasoning_effort: None,
            reasoning_summary: None,
            max_output_tokens: None,
            no_cache: false,
        }
    }

    /// Set the credential
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Enable or disable streaming
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Set the attempt timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the reasoning effort
    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    /// Set the reasoning-summary mode
    pub fn with_reasoning_summary(mut self, summary: ReasoningSummary) -> Self {
        self.reasoning_summary = Some(summary);
        self
    }

    /// Set the output token cap
    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }

    /// Set the no-cache flag
    pub fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    /// Dialect implied by the endpoint
    pub fn dialect(&self) -> ApiDialect {
        ApiDialect::detect(&self.endpoint)
    }

    /// Time-to-first-reasoning is only meaningful for streamed reasoning summaries
    pub fn tracks_reasoning(&self) -> bool {
        self.streaming && self.reasoning_summary.is_some()
    }
}

impl std::fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSpec")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("prompt_chars", &self.prompt.chars().count())
            .field("streaming", &self.streaming)
            .field("timeout", &self.timeout)
            .field("reasoning_effort", &self.reasoning_effort)
            .field("reasoning_summary", &self.reasoning_summary)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("no_cache", &self.no_cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_detection() {
        assert_eq!(
            ApiDialect::detect("https://api.openai.com/v1/chat/completions"),
            ApiDialect::ChatCompletions
        );
        assert_eq!(
            ApiDialect::detect("https://example.openai.azure.com/openai/v1/responses"),
            ApiDialect::Responses
        );
    }

    #[test]
    fn test_reasoning_enums_parse() {
        assert_eq!("HIGH".parse::<ReasoningEffort>(), Ok(ReasoningEffort::High));
        assert_eq!(
            "concise".parse::<ReasoningSummary>(),
            Ok(ReasoningSummary::Concise)
        );
        assert!("extreme".parse::<ReasoningEffort>().is_err());
        assert!("verbose".parse::<ReasoningSummary>().is_err());
    }

    #[test]
    fn test_reasoning_enums_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&ReasoningEffort::Medium).unwrap(),
            "\"medium\""
        );
        let summary: ReasoningSummary = serde_json::from_str("\"detailed\"").unwrap();
        assert_eq!(summary, ReasoningSummary::Detailed);
    }

    #[test]
    fn test_builder_defaults() {
        let spec = RequestSpec::new("http://localhost/v1/chat/completions", "gpt-4", "hi");
        assert!(!spec.streaming);
        assert_eq!(spec.timeout, DEFAULT_TIMEOUT);
        assert!(spec.api_key.is_none());
        assert!(!spec.tracks_reasoning());
    }

    #[test]
    fn test_tracks_reasoning_requires_streaming_and_summary() {
        let base = RequestSpec::new("http://localhost/v1/responses", "o3", "hi")
            .with_reasoning_summary(ReasoningSummary::Auto);
        assert!(!base.tracks_reasoning());
        assert!(base.with_streaming(true).tracks_reasoning());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let spec = RequestSpec::new("http://localhost", "m", "p").with_api_key("sk-secret");
        let debug = format!("{:?}", spec);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
