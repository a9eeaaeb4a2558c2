// ABOUTME: Chat-completions request and response types with presence-gated sampling settings
// ABOUTME: A setting is forwarded only when the client supplied it, including falsy values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

use super::TokenUsage;
use crate::models::{ConversationSettings, Message, MessageRole};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A single message in a chat-completions payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender role
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Request body for `POST {base}/chat/completions`
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    /// Model to run
    pub model: String,
    /// Messages in conversation order. Kept as raw values so structured
    /// input lists can pass through verbatim on the fallback path.
    pub messages: Vec<Value>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
    /// Nucleus sampling parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Frequency penalty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    /// Presence penalty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    /// Deterministic sampling seed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

impl ChatCompletionRequest {
    /// Build a request from typed history messages
    #[must_use]
    pub fn from_history(model: &str, history: &[ChatMessage]) -> Self {
        let messages = history
            .iter()
            .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
            .collect();
        Self::from_raw_messages(model.to_owned(), messages)
    }

    /// Build a request over raw message values
    #[must_use]
    pub const fn from_raw_messages(model: String, messages: Vec<Value>) -> Self {
        Self {
            model,
            messages,
            temperature: None,
            max_tokens: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            seed: None,
        }
    }

    /// Forward every setting the client supplied
    #[must_use]
    pub fn with_settings(mut self, settings: &ConversationSettings) -> Self {
        self.temperature = settings.temperature;
        self.max_tokens = settings.max_tokens;
        self.top_p = settings.top_p;
        self.frequency_penalty = settings.frequency_penalty;
        self.presence_penalty = settings.presence_penalty;
        self.seed = settings.seed;
        self
    }
}

/// Response body from the chat-completions endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    /// Generated choices; the first one is used
    pub choices: Vec<ChatChoice>,
    /// Token usage, if reported
    #[serde(default)]
    pub usage: Option<TokenUsage>,
    /// Model that served the request
    #[serde(default)]
    pub model: Option<String>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, empty when the provider returned none
    #[must_use]
    pub fn content(&self) -> String {
        self.choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
    }
}

/// A single choice in a chat-completions response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// Generated message
    pub message: ChatChoiceMessage,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Message inside a choice
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoiceMessage {
    /// Generated text
    #[serde(default)]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<ChatMessage> {
        vec![ChatMessage {
            role: MessageRole::User,
            content: "hi".into(),
        }]
    }

    #[test]
    fn absent_settings_are_omitted_from_the_wire() {
        let request =
            ChatCompletionRequest::from_history("m1", &history()).with_settings(&ConversationSettings::default());
        let json = serde_json::to_value(&request).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["model", "messages"]);
    }

    #[test]
    fn falsy_settings_are_still_forwarded() {
        let settings = ConversationSettings {
            seed: Some(0),
            temperature: Some(0.0),
            ..Default::default()
        };
        let request = ChatCompletionRequest::from_history("m1", &history()).with_settings(&settings);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["seed"], 0);
        assert_eq!(json["temperature"], 0.0);
        assert!(json.get("top_p").is_none());
    }

    #[test]
    fn setting_names_map_to_provider_spelling() {
        let settings = ConversationSettings {
            max_tokens: Some(128),
            top_p: Some(0.5),
            frequency_penalty: Some(1.0),
            presence_penalty: Some(-0.5),
            ..Default::default()
        };
        let request = ChatCompletionRequest::from_history("m1", &history()).with_settings(&settings);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 128);
        assert_eq!(json["top_p"], 0.5);
        assert_eq!(json["frequency_penalty"], 1.0);
        assert_eq!(json["presence_penalty"], -0.5);
    }

    #[test]
    fn response_content_falls_back_to_empty() {
        let response: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert_eq!(response.content(), "");

        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "hello"}, "finish_reason": "stop"}], "model": "m1"}"#,
        )
        .unwrap();
        assert_eq!(response.content(), "hello");
    }
}
