// ABOUTME: HTTP route assembly and the shared per-request authentication helper
// ABOUTME: Session tokens arrive in the auth_token cookie or an Authorization bearer header
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

pub mod auth;
pub mod chat;
pub mod conversations;
pub mod responses;

use crate::auth::{Claims, UNAUTHORIZED_MSG};
use crate::errors::AppError;
use crate::middleware::cors::setup_cors;
use crate::resources::ServerResources;
use crate::security::cookies::{self, AUTH_COOKIE};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the full application router
pub fn router(resources: Arc<ServerResources>) -> Router {
    let cors = setup_cors(&resources.config);

    Router::new()
        .merge(auth::AuthRoutes::routes(resources.clone()))
        .merge(conversations::ConversationRoutes::routes(resources.clone()))
        .merge(chat::ChatRoutes::routes(resources.clone()))
        .merge(responses::ResponsesRoutes::routes(resources))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Liveness probe
async fn health() -> Json<Value> {
    Json(json!({"ok": true}))
}

/// Authenticate a request from its session cookie or bearer header.
/// Every failure mode maps to the same 401 response.
pub(crate) fn authenticate(
    headers: &HeaderMap,
    resources: &ServerResources,
) -> Result<Claims, AppError> {
    let token = cookies::get_cookie_value(headers, AUTH_COOKIE)
        .or_else(|| {
            headers
                .get("authorization")
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(ToOwned::to_owned)
        })
        .ok_or_else(|| AppError::auth_required(UNAUTHORIZED_MSG))?;

    resources.auth.validate_token(&token)
}
