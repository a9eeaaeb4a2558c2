// ABOUTME: Shared test harness - temp database, stub provider, router and request helpers
// ABOUTME: Used by the store, auth, and chat flow integration tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use colloquy::auth::AuthManager;
use colloquy::config::{ProviderConfig, ServerConfig};
use colloquy::database::Database;
use colloquy::errors::{AppError, AppResult};
use colloquy::llm::chat_api::{ChatChoice, ChatChoiceMessage};
use colloquy::llm::{
    ChatCompletionRequest, ChatCompletionResponse, ProviderClient, ResponseRequest,
    ResponsesResponse, TokenUsage,
};
use colloquy::models::User;
use colloquy::resources::ServerResources;
use colloquy::routes;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const TEST_SECRET: &str = "test-secret";

/// Open a migrated database in a temp directory.
/// The directory guard must stay alive for the database to keep working.
pub async fn test_database() -> (Database, TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let url = format!("sqlite://{}/test.db", dir.path().display());
    let database = Database::connect(&url).await.expect("open database");
    database.migrate().await.expect("migrate");
    (database, dir)
}

/// Provider stub with a canned reply and a record of which wire shape was hit
pub struct StubProvider {
    pub reply: String,
    pub model: Option<String>,
    pub fail: bool,
    pub calls: Mutex<Vec<&'static str>>,
}

impl StubProvider {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_owned(),
            model: Some("stub-model".to_owned()),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::replying("")
        }
    }

    pub fn shapes(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait::async_trait]
impl ProviderClient for StubProvider {
    async fn chat_completion(
        &self,
        _request: &ChatCompletionRequest,
    ) -> AppResult<ChatCompletionResponse> {
        self.calls.lock().expect("calls lock").push("chat");
        if self.fail {
            return Err(AppError::external_service("Provider returned 500: boom"));
        }
        Ok(ChatCompletionResponse {
            choices: vec![ChatChoice {
                message: ChatChoiceMessage {
                    content: Some(self.reply.clone()),
                },
                finish_reason: Some("stop".to_owned()),
            }],
            usage: Some(TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: self.model.clone(),
        })
    }

    async fn create_response(&self, _request: &ResponseRequest) -> AppResult<ResponsesResponse> {
        self.calls.lock().expect("calls lock").push("responses");
        if self.fail {
            return Err(AppError::external_service("Provider returned 500: boom"));
        }
        Ok(ResponsesResponse {
            model: self.model.clone(),
            content: Some(self.reply.clone()),
            output: None,
            usage: Some(TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        })
    }
}

/// Assemble a router over the given database and provider
pub fn test_app(database: Database, provider: Arc<dyn ProviderClient>) -> Router {
    let config = ServerConfig {
        http_port: 0,
        database_url: String::new(),
        auth_secret: TEST_SECRET.to_owned(),
        provider: ProviderConfig {
            base_url: "http://localhost:0".to_owned(),
            api_key: String::new(),
        },
        allow_origin: None,
    };
    let resources = Arc::new(ServerResources::new(
        database,
        AuthManager::new(TEST_SECRET.to_owned()),
        provider,
        config,
    ));
    routes::router(resources)
}

/// Create a user directly in the store and mint a bearer token for it
pub async fn seeded_user(database: &Database, username: &str) -> (User, String) {
    let user = database
        .users()
        .create(
            username,
            &format!("{username}@example.com"),
            "$2b$04$placeholderplaceholderpl.aceholderplaceholderplaceha",
        )
        .await
        .expect("create user");
    let token = AuthManager::new(TEST_SECRET.to_owned())
        .generate_token(&user, false)
        .expect("token");
    (user, token)
}

/// Send a JSON request through the router
pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).expect("encode body")))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    };
    app.clone().oneshot(request).await.expect("route request")
}

/// Read a response body as JSON
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse body")
}
