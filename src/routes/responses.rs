// ABOUTME: Responses endpoint - one conversation turn through the structured-input shape
// ABOUTME: gpt-5-chat falls back to chat completions with the input coerced to messages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

use crate::errors::AppResult;
use crate::models::{ConversationSettings, Message};
use crate::resources::ServerResources;
use crate::routes::authenticate;
use crate::services::orchestration::{run_responses_turn, ResponsesTurn};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Responses turn request
#[derive(Debug, Deserialize)]
pub struct ResponsesRequest {
    /// Conversation to continue; omitted to start a new one
    #[serde(rename = "conversationId", default)]
    pub conversation_id: Option<String>,
    /// Structured input: a string or an item list, forwarded verbatim
    pub input: Value,
    /// System-style instructions
    #[serde(default)]
    pub instructions: Option<String>,
    /// Model to run
    pub model: String,
    /// Sampling settings for this turn
    #[serde(default)]
    pub settings: ConversationSettings,
    /// Accepted for wire compatibility; responses are not streamed
    #[serde(default)]
    pub stream: bool,
}

/// Model routing information echoed back to the client
#[derive(Debug, Serialize)]
pub struct RoutingInfo {
    /// Model that actually served the request
    pub model: String,
}

/// Responses turn response
#[derive(Debug, Serialize)]
pub struct ResponsesResponse {
    /// Persisted assistant message
    pub message: Message,
    /// Conversation the turn ran in
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
    /// Total tokens billed, when reported
    pub usage: Option<i64>,
    /// Routing outcome
    pub routing: RoutingInfo,
}

/// Responses route handlers
pub struct ResponsesRoutes;

impl ResponsesRoutes {
    /// Create the responses route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/responses", post(Self::create_response))
            .with_state(resources)
    }

    /// Run one responses turn
    async fn create_response(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(payload): Json<ResponsesRequest>,
    ) -> AppResult<Json<ResponsesResponse>> {
        let claims = authenticate(&headers, &resources)?;

        let outcome = run_responses_turn(
            &resources.database.conversations(),
            resources.provider.as_ref(),
            &claims.sub,
            ResponsesTurn {
                conversation_id: payload.conversation_id,
                input: payload.input,
                instructions: payload.instructions,
                model: payload.model,
                settings: payload.settings,
            },
        )
        .await?;

        Ok(Json(ResponsesResponse {
            message: outcome.message,
            conversation_id: outcome.conversation_id,
            usage: outcome.tokens_used,
            routing: RoutingInfo {
                model: outcome.used_model,
            },
        }))
    }
}
