//! Benchmark configuration
//!
//! Settings come from three layers: command line, YAML config file and
//! built-in defaults, highest precedence first. The credential additionally
//! falls back to the `LLM_API_KEY` environment variable. The layers are
//! merged once into an immutable [`BenchConfig`] before any request is sent.

use crate::error::ConfigError;
use crate::prompts::PromptSource;
use crate::request::{ReasoningEffort, ReasoningSummary, RequestSpec, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted for the credential
pub const API_KEY_ENV: &str = "LLM_API_KEY";

/// One layer of optional settings (CLI or config file)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Endpoint URL
    pub endpoint: Option<String>,
    /// Bearer credential
    pub api_key: Option<String>,
    /// Model identifier
    pub model: Option<String>,
    /// Single prompt
    pub prompt: Option<String>,
    /// Prompt file, one prompt per line
    pub prompt_file: Option<PathBuf>,
    /// Use streaming mode
    pub streaming: Option<bool>,
    /// Repetitions per prompt
    pub runs: Option<usize>,
    /// Attempt timeout in seconds
    pub timeout: Option<f64>,
    /// JSON export path
    pub output: Option<PathBuf>,
    /// Print JSON instead of tables (`json` in files, matching `--json`)
    #[serde(alias = "json")]
    pub json_output: Option<bool>,
    /// Reasoning effort
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Reasoning-summary mode
    pub reasoning_summary: Option<ReasoningSummary>,
    /// Output token cap
    pub max_tokens: Option<u32>,
    /// Ask the provider not to cache
    pub no_cache: Option<bool>,
    /// Maximum in-flight requests
    pub concurrency: Option<usize>,
}

impl Settings {
    /// Parse a YAML document; an empty document yields empty settings
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Field-wise merge: values in `self` win over those in `lower`
    pub fn or(self, lower: Settings) -> Settings {
        Settings {
            endpoint: self.endpoint.or(lower.endpoint),
            api_key: self.api_key.or(lower.api_key),
            model: self.model.or(lower.model),
            prompt: self.prompt.or(lower.prompt),
            prompt_file: self.prompt_file.or(lower.prompt_file),
            streaming: self.streaming.or(lower.streaming),
            runs: self.runs.or(lower.runs),
            timeout: self.timeout.or(lower.timeout),
            output: self.output.or(lower.output),
            json_output: self.json_output.or(lower.json_output),
            reasoning_effort: self.reasoning_effort.or(lower.reasoning_effort),
            reasoning_summary: self.reasoning_summary.or(lower.reasoning_summary),
            max_tokens: self.max_tokens.or(lower.max_tokens),
            no_cache: self.no_cache.or(lower.no_cache),
            concurrency: self.concurrency.or(lower.concurrency),
        }
    }
}

/// Settings read from a config file, with the path they came from
#[derive(Debug, Clone, PartialEq)]
pub struct FileSettings {
    /// File that was read
    pub path: PathBuf,
    /// Parsed settings
    pub settings: Settings,
}

impl FileSettings {
    /// Read and parse one config file
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Settings::from_yaml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            settings,
        })
    }

    /// Locate and read the config file.
    ///
    /// An explicit path must exist. Without one, the first existing default
    /// location is used; finding none is not an error.
    pub fn discover(explicit: Option<&Path>) -> Result<Option<Self>, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::read(path).map(Some);
        }

        for candidate in default_config_paths() {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "Using config file");
                return Self::read(&candidate).map(Some);
            }
        }
        Ok(None)
    }
}

/// Default config file locations, in lookup order
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("config.yaml"), PathBuf::from("config.yml")];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".chatbench").join("config.yaml"));
    }
    paths
}

/// Fully-resolved, immutable benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Endpoint URL
    pub endpoint: String,
    /// Bearer credential, if any layer provided one
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Prompt source
    pub prompts: PromptSource,
    /// Use streaming mode
    pub streaming: bool,
    /// Repetitions per prompt
    pub runs: usize,
    /// Attempt timeout
    pub timeout: Duration,
    /// JSON export path
    pub output: Option<PathBuf>,
    /// Print JSON instead of tables
    pub json_output: bool,
    /// Reasoning effort
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Reasoning-summary mode
    pub reasoning_summary: Option<ReasoningSummary>,
    /// Output token cap
    pub max_tokens: Option<u32>,
    /// Ask the provider not to cache
    pub no_cache: bool,
    /// Maximum in-flight requests
    pub concurrency: usize,
    /// Config file that contributed settings
    pub config_file: Option<PathBuf>,
}

impl BenchConfig {
    /// Merge CLI settings, file settings and the environment credential
    pub fn resolve(
        cli: Settings,
        file: Option<FileSettings>,
        env_api_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        let (config_file, file_settings) = match file {
            Some(loaded) => (Some(loaded.path), loaded.settings),
            None => (None, Settings::default()),
        };
        let merged = cli.or(file_settings);

        let endpoint = merged
            .endpoint
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("endpoint"))?;
        let model = merged
            .model
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("model"))?;

        let prompts = match (merged.prompt, merged.prompt_file) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::invalid(
                    "prompt",
                    "`prompt` and `prompt_file` cannot be used together",
                ))
            }
            (Some(prompt), None) => PromptSource::Inline(prompt),
            (None, Some(path)) => PromptSource::File(path),
            (None, None) => return Err(ConfigError::Missing("prompt or prompt_file")),
        };

        let runs = merged.runs.unwrap_or(1);
        if runs == 0 {
            return Err(ConfigError::invalid("runs", "must be at least 1"));
        }

        let concurrency = merged.concurrency.unwrap_or(1);
        if concurrency == 0 {
            return Err(ConfigError::invalid("concurrency", "must be at least 1"));
        }

        let timeout = match merged.timeout {
            None => DEFAULT_TIMEOUT,
            Some(secs) if secs.is_finite() && secs > 0.0 => Duration::try_from_secs_f64(secs)
                .map_err(|e| ConfigError::invalid("timeout", e.to_string()))?,
            Some(secs) => {
                return Err(ConfigError::invalid(
                    "timeout",
                    format!("must be a positive number of seconds, got {}", secs),
                ))
            }
        };

        let api_key = merged
            .api_key
            .or(env_api_key)
            .filter(|key| !key.is_empty());
        if api_key.is_none() {
            tracing::warn!("No API key configured; requests are sent without credentials");
        }

        Ok(Self {
            endpoint,
            api_key,
            model,
            prompts,
            streaming: merged.streaming.unwrap_or(false),
            runs,
            timeout,
            output: merged.output,
            json_output: merged.json_output.unwrap_or(false),
            reasoning_effort: merged.reasoning_effort,
            reasoning_summary: merged.reasoning_summary,
            max_tokens: merged.max_tokens,
            no_cache: merged.no_cache.unwrap_or(false),
            concurrency,
            config_file,
        })
    }

    /// Build the request spec for one prompt
    pub fn request_spec(&self, prompt: &str) -> RequestSpec {
        RequestSpec {
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            prompt: prompt.to_string(),
            streaming: self.streaming,
            timeout: self.timeout,
            reasoning_effort: self.reasoning_effort,
            reasoning_summary: self.reasoning_summary,
            max_output_tokens: self.max_tokens,
            no_cache: self.no_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal_cli() -> Settings {
        Settings {
            endpoint: Some("https://api.example.com/v1/chat/completions".into()),
            model: Some("gpt-4".into()),
            prompt: Some("Hello".into()),
            ..Default::default()
        }
    }

    fn file(settings: Settings) -> Option<FileSettings> {
        Some(FileSettings {
            path: PathBuf::from("config.yaml"),
            settings,
        })
    }

    #[test]
    fn test_defaults() {
        let config = BenchConfig::resolve(minimal_cli(), None, None).unwrap();
        assert!(!config.streaming);
        assert_eq!(config.runs, 1);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(!config.json_output);
        assert!(!config.no_cache);
        assert!(config.api_key.is_none());
        assert!(config.config_file.is_none());
        assert_eq!(config.prompts, PromptSource::Inline("Hello".into()));
    }

    #[test]
    fn test_cli_overrides_file() {
        let cli = Settings {
            runs: Some(5),
            ..minimal_cli()
        };
        let from_file = Settings {
            runs: Some(2),
            streaming: Some(true),
            timeout: Some(30.0),
            ..Default::default()
        };

        let config = BenchConfig::resolve(cli, file(from_file), None).unwrap();
        assert_eq!(config.runs, 5);
        assert!(config.streaming);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.config_file, Some(PathBuf::from("config.yaml")));
    }

    #[test]
    fn test_credential_precedence() {
        let env = Some("from-env".to_string());

        let config = BenchConfig::resolve(minimal_cli(), None, env.clone()).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("from-env"));

        let from_file = Settings {
            api_key: Some("from-file".into()),
            ..Default::default()
        };
        let config = BenchConfig::resolve(minimal_cli(), file(from_file.clone()), env.clone())
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("from-file"));

        let cli = Settings {
            api_key: Some("from-cli".into()),
            ..minimal_cli()
        };
        let config = BenchConfig::resolve(cli, file(from_file), env).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("from-cli"));
    }

    #[test]
    fn test_missing_required() {
        let cli = Settings {
            endpoint: None,
            ..minimal_cli()
        };
        assert!(matches!(
            BenchConfig::resolve(cli, None, None),
            Err(ConfigError::Missing("endpoint"))
        ));

        let cli = Settings {
            prompt: None,
            ..minimal_cli()
        };
        assert!(matches!(
            BenchConfig::resolve(cli, None, None),
            Err(ConfigError::Missing(_))
        ));
    }

    #[test]
    fn test_prompt_and_prompt_file_conflict() {
        let cli = Settings {
            prompt_file: Some(PathBuf::from("prompts.txt")),
            ..minimal_cli()
        };
        assert!(matches!(
            BenchConfig::resolve(cli, None, None),
            Err(ConfigError::Invalid { field: "prompt", .. })
        ));
    }

    #[test]
    fn test_invalid_numbers() {
        for cli in [
            Settings {
                runs: Some(0),
                ..minimal_cli()
            },
            Settings {
                concurrency: Some(0),
                ..minimal_cli()
            },
            Settings {
                timeout: Some(-1.0),
                ..minimal_cli()
            },
            Settings {
                timeout: Some(f64::NAN),
                ..minimal_cli()
            },
        ] {
            assert!(matches!(
                BenchConfig::resolve(cli, None, None),
                Err(ConfigError::Invalid { .. })
            ));
        }
    }

    #[test]
    fn test_timeout_too_large_for_duration() {
        let cli = Settings {
            timeout: Some(1e20),
            ..minimal_cli()
        };
        let err = BenchConfig::resolve(cli, None, None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "timeout", .. }));
    }

    #[test]
    fn test_yaml_layout() {
        let yaml = r#"
endpoint: https://example.openai.azure.com/openai/v1/responses
api_key: sk-test
model: o4-mini
prompt_file: prompts.txt
streaming: true
runs: 3
timeout: 60
reasoning_effort: high
reasoning_summary: detailed
max_tokens: 2048
no_cache: true
"#;
        let settings = Settings::from_yaml_str(yaml).unwrap();
        assert_eq!(settings.model.as_deref(), Some("o4-mini"));
        assert_eq!(settings.runs, Some(3));
        assert_eq!(settings.timeout, Some(60.0));
        assert_eq!(settings.reasoning_effort, Some(ReasoningEffort::High));
        assert_eq!(settings.reasoning_summary, Some(ReasoningSummary::Detailed));
        assert_eq!(settings.no_cache, Some(true));
        assert!(settings.prompt.is_none());
    }

    #[test]
    fn test_yaml_json_key_matches_flag() {
        let settings = Settings::from_yaml_str("json: true\n").unwrap();
        assert_eq!(settings.json_output, Some(true));

        let settings = Settings::from_yaml_str("json_output: true\n").unwrap();
        assert_eq!(settings.json_output, Some(true));
    }

    #[test]
    fn test_empty_yaml_is_empty_settings() {
        assert_eq!(Settings::from_yaml_str("  \n").unwrap(), Settings::default());
    }

    #[test]
    fn test_discover_explicit_path() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "model: gpt-4o\nruns: 2").unwrap();

        let loaded = FileSettings::discover(Some(tmp.path())).unwrap().unwrap();
        assert_eq!(loaded.path, tmp.path());
        assert_eq!(loaded.settings.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_discover_explicit_missing() {
        let err = FileSettings::discover(Some(Path::new("/no/such/config.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_discover_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "runs: [not, a, number").unwrap();

        let err = FileSettings::discover(Some(tmp.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_request_spec_carries_settings() {
        let cli = Settings {
            streaming: Some(true),
            reasoning_summary: Some(ReasoningSummary::Auto),
            max_tokens: Some(256),
            api_key: Some("k".into()),
            ..minimal_cli()
        };
        let config = BenchConfig::resolve(cli, None, None).unwrap();
        let spec = config.request_spec("Why?");
        assert_eq!(spec.prompt, "Why?");
        assert!(spec.streaming);
        assert!(spec.tracks_reasoning());
        assert_eq!(spec.max_output_tokens, Some(256));
        assert_eq!(spec.api_key.as_deref(), Some("k"));
    }
}
