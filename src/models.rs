// ABOUTME: Core domain models for users, conversations, messages, and per-conversation settings
// ABOUTME: Wire serialization uses camelCase field names throughout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A registered user account
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID
    pub id: String,
    /// Unique username
    pub username: String,
    /// Unique email address
    pub email: String,
    /// Hashed password
    pub password_hash: String,
    /// Whether the account must set a new password before the current one is checked
    pub needs_password_reset: bool,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// End-user message
    User,
    /// Model-generated message
    Assistant,
    /// System instruction
    System,
    /// Tool invocation result
    Function,
}

impl MessageRole {
    /// String form used in storage and provider payloads
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Function => "function",
        }
    }

    /// Parse from the stored string form
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "system" => Some(Self::System),
            "function" => Some(Self::Function),
            _ => None,
        }
    }
}

/// Metadata attached to assistant messages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Total tokens reported by the provider, if any
    #[serde(rename = "tokensUsed", skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<i64>,
}

/// A single message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,
    /// Sender role
    pub role: MessageRole,
    /// Message text
    pub content: String,
    /// When the message was appended
    pub timestamp: DateTime<Utc>,
    /// Model associated with this message
    pub model: String,
    /// Image attachments (data URLs or remote URLs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    /// Tool call requested by the model, forwarded verbatim
    #[serde(rename = "functionCall", skip_serializing_if = "Option::is_none")]
    pub function_call: Option<Value>,
    /// Result of a tool call, forwarded verbatim
    #[serde(rename = "functionResult", skip_serializing_if = "Option::is_none")]
    pub function_result: Option<Value>,
    /// Provider metadata for assistant messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

/// Per-conversation sampling settings.
///
/// Every field is optional; a field is forwarded to the provider only when it
/// is present, so a client that sends `{"seed": 0}` gets `seed: 0` forwarded
/// while a client that omits the key gets the provider default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationSettings {
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum tokens to generate
    #[serde(rename = "maxTokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
    /// Nucleus sampling parameter
    #[serde(rename = "topP", skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Frequency penalty
    #[serde(rename = "frequencyPenalty", skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    /// Presence penalty
    #[serde(rename = "presencePenalty", skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    /// Deterministic sampling seed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Structured-output text options, forwarded verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,
    /// Enable provider-side web search
    #[serde(rename = "webSearch", skip_serializing_if = "Option::is_none")]
    pub web_search: Option<bool>,
}

/// A conversation owned by a single user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: String,
    /// Owning user ID
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Conversation title
    pub title: String,
    /// Messages in append order
    pub messages: Vec<Message>,
    /// When the conversation was created
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// When the conversation was last modified
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    /// Default model for this conversation
    pub model: String,
    /// Sampling settings
    pub settings: ConversationSettings,
}

/// Aggregate statistics across a user's conversations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationStats {
    /// Number of conversations
    #[serde(rename = "totalConversations")]
    pub total_conversations: i64,
    /// Number of messages across all conversations
    #[serde(rename = "totalMessages")]
    pub total_messages: i64,
    /// Distinct models used
    #[serde(rename = "modelsUsed")]
    pub models_used: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_serialize_only_present_fields() {
        let settings = ConversationSettings {
            seed: Some(0),
            ..Default::default()
        };
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json, serde_json::json!({"seed": 0}));
    }

    #[test]
    fn settings_deserialize_camel_case_keys() {
        let settings: ConversationSettings =
            serde_json::from_str(r#"{"maxTokens": 256, "topP": 0.9, "webSearch": true}"#).unwrap();
        assert_eq!(settings.max_tokens, Some(256));
        assert_eq!(settings.top_p, Some(0.9));
        assert_eq!(settings.web_search, Some(true));
        assert!(settings.temperature.is_none());
    }

    #[test]
    fn message_role_round_trips_through_storage_form() {
        for role in [
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::System,
            MessageRole::Function,
        ] {
            assert_eq!(MessageRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(MessageRole::parse("tool"), None);
    }

    #[test]
    fn metadata_omits_unreported_token_counts() {
        let empty = serde_json::to_value(MessageMetadata::default()).unwrap();
        assert_eq!(empty, serde_json::json!({}));

        let counted = serde_json::to_value(MessageMetadata {
            tokens_used: Some(15),
        })
        .unwrap();
        assert_eq!(counted, serde_json::json!({"tokensUsed": 15}));
    }
}
