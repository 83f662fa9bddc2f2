//! Request bodies and buffered response extraction for both API dialects

use chatbench_core::{ApiDialect, RequestSpec};
use serde_json::{json, Map, Value};

use crate::traits::TransportError;

/// Build the JSON body for one attempt.
pub fn build_request_body(spec: &RequestSpec) -> Value {
    match spec.dialect() {
        ApiDialect::ChatCompletions => chat_body(spec),
        ApiDialect::Responses => responses_body(spec),
    }
}

fn chat_body(spec: &RequestSpec) -> Value {
    let mut body = Map::new();
    body.insert("model".into(), json!(spec.model));
    body.insert(
        "messages".into(),
        json!([{ "role": "user", "content": spec.prompt }]),
    );
    body.insert("stream".into(), json!(spec.streaming));

    if spec.streaming {
        body.insert("stream_options".into(), json!({ "include_usage": true }));
    }
    if let Some(effort) = spec.reasoning_effort {
        body.insert("reasoning_effort".into(), json!(effort.as_str()));
    }
    if let Some(summary) = spec.reasoning_summary {
        body.insert("reasoning_summary".into(), json!(summary.as_str()));
    }
    if let Some(max) = spec.max_output_tokens {
        body.insert("max_tokens".into(), json!(max));
    }

    Value::Object(body)
}

fn responses_body(spec: &RequestSpec) -> Value {
    let mut body = Map::new();
    body.insert("model".into(), json!(spec.model));
    body.insert("input".into(), json!(spec.prompt));
    body.insert("stream".into(), json!(spec.streaming));

    let mut reasoning = Map::new();
    if let Some(effort) = spec.reasoning_effort {
        reasoning.insert("effort".into(), json!(effort.as_str()));
    }
    if let Some(summary) = spec.reasoning_summary {
        reasoning.insert("summary".into(), json!(summary.as_str()));
    }
    if !reasoning.is_empty() {
        body.insert("reasoning".into(), Value::Object(reasoning));
    }

    if let Some(max) = spec.max_output_tokens {
        body.insert("max_output_tokens".into(), json!(max));
    }
    if spec.no_cache {
        body.insert("store".into(), json!(false));
    }

    Value::Object(body)
}

/// Text and usage extracted from a buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedContent {
    /// Response text
    pub text: String,
    /// Server-reported completion tokens, if any
    pub completion_tokens: Option<usize>,
}

/// Decode a buffered 2xx body.
pub fn extract_buffered(dialect: ApiDialect, body: &str) -> Result<BufferedContent, TransportError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| TransportError::InvalidBody(e.to_string()))?;

    let text = match dialect {
        ApiDialect::ChatCompletions => value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        ApiDialect::Responses => responses_output_text(&value),
    };

    Ok(BufferedContent {
        text,
        completion_tokens: value.get("usage").and_then(usage_completion_tokens),
    })
}

fn responses_output_text(value: &Value) -> String {
    let Some(output) = value.get("output").and_then(Value::as_array) else {
        return String::new();
    };

    output
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("message"))
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect()
}

/// Completion tokens from a usage object, in either naming convention.
pub(crate) fn usage_completion_tokens(usage: &Value) -> Option<usize> {
    usage
        .get("completion_tokens")
        .or_else(|| usage.get("output_tokens"))
        .and_then(Value::as_u64)
        .map(|v| v as usize)
}
