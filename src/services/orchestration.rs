// ABOUTME: Conversation turn orchestration - resolve conversation, persist, call provider, persist
// ABOUTME: The user message is persisted before dispatch and survives provider failure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

//! # Turn Orchestration
//!
//! A turn resolves (or creates) the conversation, appends the user message,
//! calls the provider in the selected wire shape, and appends the assistant
//! reply. There are no retries and no rollback: a provider failure leaves the
//! user message in place so the client can retry against intact history.

use crate::database::ConversationStore;
use crate::errors::{AppError, AppResult};
use crate::llm::{
    derive_title, parse_user_input, title_from_input, CallShape, ChatCompletionRequest,
    ChatMessage, ProviderClient, ResponseRequest, TokenUsage,
};
use crate::models::{Conversation, ConversationSettings, Message, MessageMetadata, MessageRole};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

/// Error message for a missing or foreign conversation
const CONVERSATION_NOT_FOUND: &str = "Conversation not found";

/// How a conversation was obtained for this turn
pub enum Resolved {
    /// The client referenced an existing conversation it owns
    Existing(Conversation),
    /// No ID was supplied, so a fresh conversation was created
    Created(Conversation),
}

impl Resolved {
    /// The conversation either way
    #[must_use]
    pub fn into_inner(self) -> Conversation {
        match self {
            Self::Existing(c) | Self::Created(c) => c,
        }
    }
}

/// Resolve the referenced conversation or create a new one with the given
/// title. A supplied ID that does not resolve for this user is a 404,
/// whether it belongs to someone else or nobody.
///
/// # Errors
///
/// Returns `ResourceNotFound` for unresolvable IDs, or a database error
pub async fn resolve_or_create(
    store: &ConversationStore,
    user_id: &str,
    conversation_id: Option<&str>,
    title: &str,
    model: &str,
    settings: &ConversationSettings,
) -> AppResult<Resolved> {
    match conversation_id {
        Some(id) => {
            let conversation = store
                .get(user_id, id)
                .await?
                .ok_or_else(|| AppError::not_found(CONVERSATION_NOT_FOUND))?;
            Ok(Resolved::Existing(conversation))
        }
        None => {
            let conversation = store.create(user_id, title, model, settings).await?;
            info!(conversation_id = %conversation.id, "Created conversation");
            Ok(Resolved::Created(conversation))
        }
    }
}

/// Input for a chat-endpoint turn
pub struct ChatTurn {
    /// Existing conversation to continue, if any
    pub conversation_id: Option<String>,
    /// User message text
    pub content: String,
    /// Image attachments
    pub images: Option<Vec<String>>,
    /// Model to run
    pub model: String,
    /// Sampling settings for this turn
    pub settings: ConversationSettings,
}

/// Outcome of a chat-endpoint turn
pub struct ChatTurnOutcome {
    /// Persisted assistant message
    pub message: Message,
    /// Conversation the turn ran in
    pub conversation_id: String,
    /// Provider-reported usage, if any
    pub usage: Option<TokenUsage>,
}

/// Run one chat-completions turn
///
/// # Errors
///
/// Returns `ResourceNotFound` for unresolvable conversations,
/// `ExternalServiceError` when the provider call fails (the user message is
/// already persisted at that point), or a database error
pub async fn run_chat_turn(
    store: &ConversationStore,
    provider: &dyn ProviderClient,
    user_id: &str,
    turn: ChatTurn,
) -> AppResult<ChatTurnOutcome> {
    let resolved = resolve_or_create(
        store,
        user_id,
        turn.conversation_id.as_deref(),
        &derive_title(&turn.content),
        &turn.model,
        &turn.settings,
    )
    .await?;
    let conversation = resolved.into_inner();

    let user_message = build_user_message(&turn.content, turn.images, &turn.model);
    append_or_not_found(store, user_id, &conversation.id, &user_message).await?;

    // History is the snapshot taken at resolve time plus the new user turn
    let mut history: Vec<ChatMessage> =
        conversation.messages.iter().map(ChatMessage::from).collect();
    history.push(ChatMessage {
        role: MessageRole::User,
        content: turn.content,
    });

    let request =
        ChatCompletionRequest::from_history(&turn.model, &history).with_settings(&turn.settings);
    let response = provider.chat_completion(&request).await?;

    let tokens_used = response.usage.as_ref().map(|u| u.total_tokens);
    let assistant_message =
        build_assistant_message(response.content(), &turn.model, tokens_used);
    append_or_not_found(store, user_id, &conversation.id, &assistant_message).await?;

    Ok(ChatTurnOutcome {
        message: assistant_message,
        conversation_id: conversation.id,
        usage: response.usage,
    })
}

/// Input for a responses-endpoint turn
pub struct ResponsesTurn {
    /// Existing conversation to continue, if any
    pub conversation_id: Option<String>,
    /// Structured input, forwarded verbatim to the provider
    pub input: Value,
    /// System-style instructions
    pub instructions: Option<String>,
    /// Model to run
    pub model: String,
    /// Sampling settings for this turn
    pub settings: ConversationSettings,
}

/// Outcome of a responses-endpoint turn
pub struct ResponsesTurnOutcome {
    /// Persisted assistant message
    pub message: Message,
    /// Conversation the turn ran in
    pub conversation_id: String,
    /// Total tokens billed, if reported
    pub tokens_used: Option<i64>,
    /// Model that actually served the request
    pub used_model: String,
}

/// Run one responses-endpoint turn, routing `gpt-5-chat` through the
/// chat-completions shape
///
/// # Errors
///
/// Same failure modes as [`run_chat_turn`]
pub async fn run_responses_turn(
    store: &ConversationStore,
    provider: &dyn ProviderClient,
    user_id: &str,
    turn: ResponsesTurn,
) -> AppResult<ResponsesTurnOutcome> {
    let resolved = resolve_or_create(
        store,
        user_id,
        turn.conversation_id.as_deref(),
        &title_from_input(&turn.input),
        &turn.model,
        &turn.settings,
    )
    .await?;
    let conversation = resolved.into_inner();

    let (content, images) = parse_user_input(&turn.input);
    let user_message = build_user_message(
        &content,
        (!images.is_empty()).then_some(images),
        &turn.model,
    );
    append_or_not_found(store, user_id, &conversation.id, &user_message).await?;

    let (assistant_content, tokens_used, used_model) =
        match CallShape::for_responses(&turn.model) {
            CallShape::Chat => {
                // This model only speaks chat completions: an input list is
                // already message-shaped, a scalar becomes one user message
                let messages = match &turn.input {
                    Value::Array(items) => items.clone(),
                    other => vec![json!({"role": "user", "content": other})],
                };
                let request = ChatCompletionRequest::from_raw_messages(turn.model.clone(), messages)
                    .with_settings(&turn.settings);
                let response = provider.chat_completion(&request).await?;
                let tokens = response.usage.as_ref().map(|u| u.total_tokens);
                (response.content(), tokens, turn.model.clone())
            }
            CallShape::Structured => {
                let request = ResponseRequest::new(
                    turn.model.clone(),
                    turn.input.clone(),
                    turn.instructions.clone(),
                    &turn.settings,
                );
                let response = provider.create_response(&request).await?;
                let tokens = response.usage.as_ref().map(|u| u.total_tokens);
                let used_model = response.used_model(&turn.model);
                (response.extract_content(), tokens, used_model)
            }
        };

    let assistant_message = build_assistant_message(assistant_content, &used_model, tokens_used);
    append_or_not_found(store, user_id, &conversation.id, &assistant_message).await?;

    Ok(ResponsesTurnOutcome {
        message: assistant_message,
        conversation_id: conversation.id,
        tokens_used,
        used_model,
    })
}

fn build_user_message(content: &str, images: Option<Vec<String>>, model: &str) -> Message {
    Message {
        id: Uuid::new_v4().to_string(),
        role: MessageRole::User,
        content: content.to_owned(),
        timestamp: Utc::now(),
        model: model.to_owned(),
        images: images.filter(|i| !i.is_empty()),
        function_call: None,
        function_result: None,
        metadata: None,
    }
}

fn build_assistant_message(content: String, model: &str, tokens_used: Option<i64>) -> Message {
    Message {
        id: Uuid::new_v4().to_string(),
        role: MessageRole::Assistant,
        content,
        timestamp: Utc::now(),
        model: model.to_owned(),
        images: None,
        function_call: None,
        function_result: None,
        metadata: Some(MessageMetadata { tokens_used }),
    }
}

/// Append a message, treating a vanished conversation as not found
async fn append_or_not_found(
    store: &ConversationStore,
    user_id: &str,
    conversation_id: &str,
    message: &Message,
) -> AppResult<()> {
    if store.append_message(user_id, conversation_id, message).await? {
        Ok(())
    } else {
        Err(AppError::not_found(CONVERSATION_NOT_FOUND))
    }
}
