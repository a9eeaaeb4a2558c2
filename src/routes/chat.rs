// ABOUTME: Chat endpoint - one conversation turn through the chat-completions shape
// ABOUTME: Appends the user message, calls the provider, appends and returns the reply
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

use crate::errors::AppResult;
use crate::models::{ConversationSettings, Message};
use crate::resources::ServerResources;
use crate::routes::authenticate;
use crate::services::orchestration::{run_chat_turn, ChatTurn};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// User message within a chat request
#[derive(Debug, Deserialize)]
pub struct MessageInput {
    /// Message text
    pub content: String,
    /// Image attachments
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

/// Chat turn request
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Conversation to continue; omitted to start a new one
    #[serde(rename = "conversationId", default)]
    pub conversation_id: Option<String>,
    /// User message
    pub message: MessageInput,
    /// Model to run
    pub model: String,
    /// Sampling settings for this turn
    #[serde(default)]
    pub settings: ConversationSettings,
    /// Accepted for wire compatibility; responses are not streamed
    #[serde(default)]
    pub stream: bool,
}

/// Chat turn response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Persisted assistant message
    pub message: Message,
    /// Conversation the turn ran in
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
    /// Provider usage, when reported
    pub usage: Option<crate::llm::TokenUsage>,
}

/// Chat route handlers
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create the chat route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/chat", post(Self::chat))
            .with_state(resources)
    }

    /// Run one chat turn
    async fn chat(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(payload): Json<ChatRequest>,
    ) -> AppResult<Json<ChatResponse>> {
        let claims = authenticate(&headers, &resources)?;

        let outcome = run_chat_turn(
            &resources.database.conversations(),
            resources.provider.as_ref(),
            &claims.sub,
            ChatTurn {
                conversation_id: payload.conversation_id,
                content: payload.message.content,
                images: payload.message.images,
                model: payload.model,
                settings: payload.settings,
            },
        )
        .await?;

        Ok(Json(ChatResponse {
            message: outcome.message,
            conversation_id: outcome.conversation_id,
            usage: outcome.usage,
        }))
    }
}
