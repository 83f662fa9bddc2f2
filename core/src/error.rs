//! Error types for chatbench-core

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Classification of a failed request attempt.
///
/// Every failure is captured at the attempt boundary and recorded in the
/// attempt's result; none of these abort a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connection refused, DNS or TLS failure, or a connection dropped mid-stream
    Transport,
    /// The attempt exceeded its configured timeout
    Timeout,
    /// The endpoint answered with a non-2xx status
    HttpStatus,
    /// A 2xx buffered body that could not be decoded as JSON
    InvalidResponse,
}

impl ErrorKind {
    /// Stable identifier used in exports
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Timeout => "timeout",
            ErrorKind::HttpStatus => "http_status",
            ErrorKind::InvalidResponse => "invalid_response",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while resolving configuration or loading prompts
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting was not provided by any layer
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    /// A setting has an unusable value
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        /// Setting name
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// An explicitly requested config file does not exist
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The config file is not valid YAML for the expected layout
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        /// File that failed to parse
        path: PathBuf,
        /// Underlying YAML error
        #[source]
        source: serde_yaml::Error,
    },

    /// A file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File that could not be read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The prompt file contains no usable prompt lines
    #[error("no prompts found in {}", .0.display())]
    EmptyPromptFile(PathBuf),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::HttpStatus).unwrap(),
            "\"http_status\""
        );
        assert_eq!(ErrorKind::Timeout.to_string(), "timeout");
    }

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::Missing("endpoint").to_string(),
            "missing required setting `endpoint`"
        );
        let err = ConfigError::invalid("runs", "must be at least 1");
        assert_eq!(err.to_string(), "invalid value for `runs`: must be at least 1");
    }
}
