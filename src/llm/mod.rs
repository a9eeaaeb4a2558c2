// ABOUTME: LLM provider integration - call-shape routing, shared types, and the HTTP client
// ABOUTME: Two wire shapes exist: chat completions and the structured responses API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

//! # Provider Router
//!
//! Requests reach the provider in one of two shapes. The chat endpoint always
//! uses the chat-completions shape. The responses endpoint uses the structured
//! responses shape, except for `gpt-5-chat`, which only speaks
//! chat-completions and falls back to it with the structured input coerced
//! into messages.

pub mod chat_api;
pub mod responses_api;

pub use chat_api::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
pub use responses_api::{ResponseRequest, ResponsesResponse};

use crate::config::ProviderConfig;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Model that must be served through the chat-completions shape even on the
/// responses endpoint
pub const CHAT_FALLBACK_MODEL: &str = "gpt-5-chat";

/// Title given to conversations whose first input has no usable text
pub const DEFAULT_TITLE: &str = "New conversation";

/// Maximum title length derived from the first message
const TITLE_MAX_CHARS: usize = 50;

/// Connection timeout for the provider endpoint
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Request timeout (generation can be slow)
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Wire shape of a provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// `POST {base}/chat/completions`
    Chat,
    /// `POST {base}/responses`
    Structured,
}

impl CallShape {
    /// Select the shape for a responses-endpoint request
    #[must_use]
    pub fn for_responses(model: &str) -> Self {
        if model == CHAT_FALLBACK_MODEL {
            Self::Chat
        } else {
            Self::Structured
        }
    }
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: i64,
    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: i64,
    /// Total tokens billed
    #[serde(default)]
    pub total_tokens: i64,
}

/// Derive a conversation title from its first message text:
/// the first 50 characters, with an ellipsis marker when truncated
#[must_use]
pub fn derive_title(text: &str) -> String {
    let mut title: String = text.chars().take(TITLE_MAX_CHARS).collect();
    if text.chars().count() > TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}

/// Derive a title from a structured-input value: plain strings and
/// `input_text` items yield a derived title, anything else the placeholder
#[must_use]
pub fn title_from_input(input: &Value) -> String {
    if let Some(text) = input.as_str() {
        return derive_title(text);
    }
    if let Some(items) = input.as_array() {
        let text_item = items
            .iter()
            .find(|item| item.get("type").and_then(Value::as_str) == Some("input_text"));
        if let Some(text) = text_item
            .and_then(|item| item.get("text"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
        {
            return derive_title(text);
        }
    }
    DEFAULT_TITLE.to_owned()
}

/// Split a structured-input value into message text and image attachments.
///
/// Strings pass through; arrays contribute the first `input_text` item's text
/// plus every `input_image` URL; any other value is stored in its JSON form.
#[must_use]
pub fn parse_user_input(input: &Value) -> (String, Vec<String>) {
    if let Some(text) = input.as_str() {
        return (text.to_owned(), Vec::new());
    }
    if let Some(items) = input.as_array() {
        let content = items
            .iter()
            .find(|item| item.get("type").and_then(Value::as_str) == Some("input_text"))
            .and_then(|item| item.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let images = items
            .iter()
            .filter(|item| item.get("type").and_then(Value::as_str) == Some("input_image"))
            .filter_map(|item| item.get("image_url").and_then(Value::as_str))
            .map(ToOwned::to_owned)
            .collect();
        return (content, images);
    }
    (input.to_string(), Vec::new())
}

/// Seam between orchestration and the provider wire protocol
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Issue a chat-completions call
    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> AppResult<ChatCompletionResponse>;

    /// Issue a structured responses call
    async fn create_response(&self, request: &ResponseRequest) -> AppResult<ResponsesResponse>;
}

/// HTTP client for an OpenAI-compatible provider endpoint
pub struct HttpProviderClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpProviderClient {
    /// Create a client for the configured provider
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built
    pub fn new(config: &ProviderConfig) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        request: &Req,
    ) -> AppResult<Resp> {
        let url = self.api_url(path);
        debug!(url = %url, "Sending provider request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::external_service(format!("Provider request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = parse_error_message(&body)
                .unwrap_or_else(|| body.chars().take(200).collect());
            return Err(AppError::external_service(format!(
                "Provider returned {status}: {message}"
            )));
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| AppError::external_service(format!("Invalid provider response: {e}")))
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> AppResult<ChatCompletionResponse> {
        self.post_json("chat/completions", request).await
    }

    async fn create_response(&self, request: &ResponseRequest) -> AppResult<ResponsesResponse> {
        self.post_json("responses", request).await
    }
}

/// Pull the message out of a provider error body, if it has the standard shape
fn parse_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn short_titles_are_kept_verbatim() {
        assert_eq!(derive_title("Hello"), "Hello");
    }

    #[test]
    fn long_titles_are_truncated_with_marker() {
        let text = "x".repeat(60);
        let title = derive_title(&text);
        assert_eq!(title.chars().count(), 53);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn exactly_fifty_chars_is_not_truncated() {
        let text = "y".repeat(50);
        assert_eq!(derive_title(&text), text);
    }

    #[test]
    fn title_truncation_respects_char_boundaries() {
        let text = "é".repeat(60);
        let title = derive_title(&text);
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), 53);
    }

    #[test]
    fn title_from_string_input() {
        assert_eq!(title_from_input(&json!("Tell me a story")), "Tell me a story");
    }

    #[test]
    fn title_from_structured_input_uses_first_text_item() {
        let input = json!([
            {"type": "input_image", "image_url": "data:image/png;base64,xyz"},
            {"type": "input_text", "text": "What is in this image?"},
        ]);
        assert_eq!(title_from_input(&input), "What is in this image?");
    }

    #[test]
    fn title_falls_back_to_placeholder() {
        let input = json!([{"type": "input_image", "image_url": "http://x/y.png"}]);
        assert_eq!(title_from_input(&input), DEFAULT_TITLE);
        assert_eq!(title_from_input(&json!({"other": 1})), DEFAULT_TITLE);
    }

    #[test]
    fn parse_user_input_splits_text_and_images() {
        let input = json!([
            {"type": "input_text", "text": "Describe these"},
            {"type": "input_image", "image_url": "http://x/a.png"},
            {"type": "input_image", "image_url": "http://x/b.png"},
        ]);
        let (content, images) = parse_user_input(&input);
        assert_eq!(content, "Describe these");
        assert_eq!(images, vec!["http://x/a.png", "http://x/b.png"]);
    }

    #[test]
    fn parse_user_input_stringifies_unknown_shapes() {
        let (content, images) = parse_user_input(&json!(42));
        assert_eq!(content, "42");
        assert!(images.is_empty());
    }

    #[test]
    fn call_shape_routes_gpt5_chat_to_chat() {
        assert_eq!(CallShape::for_responses("gpt-5-chat"), CallShape::Chat);
        assert_eq!(CallShape::for_responses("o4-mini"), CallShape::Structured);
        // Prefixes do not count
        assert_eq!(
            CallShape::for_responses("gpt-5-chat-latest"),
            CallShape::Structured
        );
    }

    #[test]
    fn provider_error_body_is_parsed() {
        let body = r#"{"error": {"message": "model not found", "type": "invalid_request_error"}}"#;
        assert_eq!(parse_error_message(body).as_deref(), Some("model not found"));
        assert_eq!(parse_error_message("not json"), None);
    }
}
