// ABOUTME: Structured responses API request and response types
// ABOUTME: Input passes through verbatim; output parsing prefers content, then output, then empty
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

use super::TokenUsage;
use crate::models::ConversationSettings;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Request body for `POST {base}/responses`
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRequest {
    /// Model to run
    pub model: String,
    /// Client input, forwarded verbatim (string or item list)
    pub input: Value,
    /// System-style instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Output token cap, mapped from the client's `maxTokens`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<i64>,
    /// Structured-output text options, forwarded verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,
    /// Present (as an empty object) when the client enabled web search
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_search_options: Option<Value>,
}

impl ResponseRequest {
    /// Assemble a request from the client's input, instructions, and settings
    #[must_use]
    pub fn new(
        model: String,
        input: Value,
        instructions: Option<String>,
        settings: &ConversationSettings,
    ) -> Self {
        // Instructions and the text option are forwarded only when truthy,
        // not merely present
        let instructions = instructions.filter(|i| !i.is_empty());
        let text = settings.text.clone().filter(is_truthy);
        let web_search_options = (settings.web_search == Some(true)).then(|| json!({}));

        Self {
            model,
            input,
            instructions,
            max_output_tokens: settings.max_tokens,
            text,
            web_search_options,
        }
    }
}

/// Truthiness in the sense the settings bag uses: null, false, zero, and
/// empty containers do not count
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Response body from the responses endpoint.
///
/// Providers differ in where the generated text lands, so both `content` and
/// `output` are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsesResponse {
    /// Model that served the request
    #[serde(default)]
    pub model: Option<String>,
    /// Flat text content, when present
    #[serde(default)]
    pub content: Option<String>,
    /// Structured output items or flat text, when present
    #[serde(default)]
    pub output: Option<Value>,
    /// Token usage, if reported
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl ResponsesResponse {
    /// Generated text: `content` when non-empty, otherwise flattened
    /// `output`, otherwise empty
    #[must_use]
    pub fn extract_content(&self) -> String {
        if let Some(content) = self.content.as_ref().filter(|c| !c.is_empty()) {
            return content.clone();
        }
        match &self.output {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(items)) => flatten_output_items(items),
            _ => String::new(),
        }
    }

    /// Model actually used, falling back to the requested one
    #[must_use]
    pub fn used_model(&self, requested: &str) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| requested.to_owned())
    }
}

/// Concatenate the text of `output_text` parts inside response output items
fn flatten_output_items(items: &[Value]) -> String {
    let mut text = String::new();
    for item in items {
        if let Some(parts) = item.get("content").and_then(Value::as_array) {
            for part in parts {
                if part.get("type").and_then(Value::as_str) == Some("output_text") {
                    if let Some(t) = part.get("text").and_then(Value::as_str) {
                        text.push_str(t);
                    }
                }
            }
        } else if let Some(t) = item.get("text").and_then(Value::as_str) {
            text.push_str(t);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_forwards_only_supplied_settings() {
        let settings = ConversationSettings {
            max_tokens: Some(512),
            web_search: Some(true),
            ..Default::default()
        };
        let request = ResponseRequest::new(
            "o4-mini".into(),
            json!("hello"),
            Some("Be brief".into()),
            &settings,
        );
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["input"], "hello");
        assert_eq!(body["instructions"], "Be brief");
        assert_eq!(body["max_output_tokens"], 512);
        assert_eq!(body["web_search_options"], json!({}));
        assert!(body.get("text").is_none());
    }

    #[test]
    fn web_search_false_is_not_forwarded() {
        let settings = ConversationSettings {
            web_search: Some(false),
            ..Default::default()
        };
        let request = ResponseRequest::new("m".into(), json!("x"), None, &settings);
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("web_search_options").is_none());
        assert!(body.get("instructions").is_none());
    }

    #[test]
    fn empty_text_option_is_not_forwarded() {
        let settings = ConversationSettings {
            text: Some(json!({})),
            ..Default::default()
        };
        let request = ResponseRequest::new("m".into(), json!("x"), None, &settings);
        assert!(request.text.is_none());

        let settings = ConversationSettings {
            text: Some(json!({"format": {"type": "json_object"}})),
            ..Default::default()
        };
        let request = ResponseRequest::new("m".into(), json!("x"), None, &settings);
        assert!(request.text.is_some());
    }

    #[test]
    fn content_wins_over_output() {
        let response: ResponsesResponse = serde_json::from_value(json!({
            "content": "direct",
            "output": "indirect",
        }))
        .unwrap();
        assert_eq!(response.extract_content(), "direct");
    }

    #[test]
    fn empty_content_falls_back_to_output() {
        let response: ResponsesResponse = serde_json::from_value(json!({
            "content": "",
            "output": "fallback",
        }))
        .unwrap();
        assert_eq!(response.extract_content(), "fallback");
    }

    #[test]
    fn structured_output_items_are_flattened() {
        let response: ResponsesResponse = serde_json::from_value(json!({
            "output": [
                {"type": "message", "content": [
                    {"type": "output_text", "text": "Hello "},
                    {"type": "output_text", "text": "world"},
                ]},
            ],
        }))
        .unwrap();
        assert_eq!(response.extract_content(), "Hello world");
    }

    #[test]
    fn missing_everything_yields_empty_content() {
        let response = ResponsesResponse::default();
        assert_eq!(response.extract_content(), "");
    }

    #[test]
    fn used_model_falls_back_to_requested() {
        let response: ResponsesResponse =
            serde_json::from_value(json!({"model": "o4-mini-2026"})).unwrap();
        assert_eq!(response.used_model("o4-mini"), "o4-mini-2026");

        let response = ResponsesResponse::default();
        assert_eq!(response.used_model("o4-mini"), "o4-mini");
    }
}
