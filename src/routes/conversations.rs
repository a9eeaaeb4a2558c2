// ABOUTME: Conversation CRUD routes with a multiplexed GET for fetch, search, list, and stats
// ABOUTME: All operations are scoped to the authenticated owner
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

use crate::errors::{AppError, AppResult};
use crate::models::ConversationSettings;
use crate::resources::ServerResources;
use crate::routes::authenticate;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Default number of conversations returned by list and search
const fn default_limit() -> i64 {
    50
}

/// Query parameters for the multiplexed GET
#[derive(Debug, Deserialize, Default)]
pub struct GetQuery {
    /// Fetch a single conversation by ID
    pub id: Option<String>,
    /// Search by title or message content
    pub search: Option<String>,
    /// Return aggregate statistics instead of conversations
    #[serde(default)]
    pub stats: bool,
    /// Maximum conversations to return
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Query parameters for DELETE
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// Conversation to delete
    pub id: String,
}

/// Request to create a conversation
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    /// Conversation title
    pub title: String,
    /// Default model
    pub model: String,
    /// Sampling settings
    #[serde(default)]
    pub settings: Option<ConversationSettings>,
}

/// Request to update a conversation
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    /// Conversation to update
    pub id: String,
    /// New title, if changing
    #[serde(default)]
    pub title: Option<String>,
    /// New settings, if changing
    #[serde(default)]
    pub settings: Option<ConversationSettings>,
}

/// Conversation route handlers
pub struct ConversationRoutes;

impl ConversationRoutes {
    /// Create all conversation routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/conversations", get(Self::get_multiplexed))
            .route("/api/conversations", post(Self::create))
            .route("/api/conversations", put(Self::update))
            .route("/api/conversations", delete(Self::delete))
            .with_state(resources)
    }

    /// Stats, single fetch, search, or list, in that precedence order
    async fn get_multiplexed(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<GetQuery>,
    ) -> AppResult<Json<Value>> {
        let claims = authenticate(&headers, &resources)?;
        let store = resources.database.conversations();

        if query.stats {
            let stats = store.stats(&claims.sub).await?;
            return to_json(&stats);
        }

        if let Some(id) = &query.id {
            let conversation = store
                .get(&claims.sub, id)
                .await?
                .ok_or_else(|| AppError::not_found("Conversation not found"))?;
            return to_json(&conversation);
        }

        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            let results = store.search(&claims.sub, search, query.limit).await?;
            return to_json(&results);
        }

        let conversations = store.list(&claims.sub, query.limit).await?;
        to_json(&conversations)
    }

    /// Create an empty conversation
    async fn create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(payload): Json<CreateRequest>,
    ) -> AppResult<Json<Value>> {
        let claims = authenticate(&headers, &resources)?;
        let settings = payload.settings.unwrap_or_default();
        let conversation = resources
            .database
            .conversations()
            .create(&claims.sub, &payload.title, &payload.model, &settings)
            .await?;
        to_json(&conversation)
    }

    /// Update title and/or settings
    async fn update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(payload): Json<UpdateRequest>,
    ) -> AppResult<Json<Value>> {
        let claims = authenticate(&headers, &resources)?;
        let conversation = resources
            .database
            .conversations()
            .update(
                &claims.sub,
                &payload.id,
                payload.title.as_deref(),
                payload.settings.as_ref(),
            )
            .await?
            .ok_or_else(|| AppError::not_found("Conversation not found"))?;
        to_json(&conversation)
    }

    /// Delete a conversation; absent and foreign IDs succeed silently
    async fn delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<DeleteQuery>,
    ) -> AppResult<Json<Value>> {
        let claims = authenticate(&headers, &resources)?;
        resources
            .database
            .conversations()
            .delete(&claims.sub, &query.id)
            .await?;
        Ok(Json(json!({"success": true})))
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> AppResult<Json<Value>> {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| AppError::serialization(format!("Failed to encode response: {e}")))
}
