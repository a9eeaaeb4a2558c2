// ABOUTME: Integration tests for chat and responses turns and the conversation REST surface
// ABOUTME: Uses a stub provider to observe call-shape routing and failure behavior
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

mod common;

use axum::http::StatusCode;
use common::{body_json, request, seeded_user, test_app, test_database, StubProvider};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn chat_without_id_creates_a_titled_conversation() {
    let (db, _dir) = test_database().await;
    let provider = Arc::new(StubProvider::replying("Hello there!"));
    let app = test_app(db.clone(), provider);
    let (_user, token) = seeded_user(&db, "alice").await;

    let response = request(
        &app,
        "POST",
        "/api/chat",
        Some(&token),
        Some(json!({
            "message": {"content": "Tell me about Rust"},
            "model": "m1",
            "settings": {"temperature": 0.5},
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["message"]["role"], "assistant");
    assert_eq!(body["message"]["content"], "Hello there!");
    assert_eq!(body["message"]["metadata"]["tokensUsed"], 15);
    assert_eq!(body["usage"]["total_tokens"], 15);
    let conversation_id = body["conversationId"].as_str().unwrap();

    let fetched = request(
        &app,
        "GET",
        &format!("/api/conversations?id={conversation_id}"),
        Some(&token),
        None,
    )
    .await;
    let conversation = body_json(fetched).await;
    assert_eq!(conversation["title"], "Tell me about Rust");
    assert_eq!(conversation["messages"].as_array().unwrap().len(), 2);
    assert_eq!(conversation["messages"][0]["role"], "user");
    assert_eq!(conversation["messages"][0]["content"], "Tell me about Rust");
    assert_eq!(conversation["messages"][1]["role"], "assistant");
}

#[tokio::test]
async fn long_first_messages_yield_truncated_titles() {
    let (db, _dir) = test_database().await;
    let app = test_app(db.clone(), Arc::new(StubProvider::replying("ok")));
    let (_user, token) = seeded_user(&db, "alice").await;

    let long = "a".repeat(80);
    let response = request(
        &app,
        "POST",
        "/api/chat",
        Some(&token),
        Some(json!({"message": {"content": long}, "model": "m1"})),
    )
    .await;
    let conversation_id = body_json(response).await["conversationId"]
        .as_str()
        .unwrap()
        .to_owned();

    let fetched = request(
        &app,
        "GET",
        &format!("/api/conversations?id={conversation_id}"),
        Some(&token),
        None,
    )
    .await;
    let title = body_json(fetched).await["title"].as_str().unwrap().to_owned();
    assert_eq!(title, format!("{}...", "a".repeat(50)));
}

#[tokio::test]
async fn chat_into_a_foreign_conversation_is_not_found() {
    let (db, _dir) = test_database().await;
    let app = test_app(db.clone(), Arc::new(StubProvider::replying("ok")));
    let (_alice, alice_token) = seeded_user(&db, "alice").await;
    let (_bob, bob_token) = seeded_user(&db, "bob").await;

    let created = request(
        &app,
        "POST",
        "/api/conversations",
        Some(&alice_token),
        Some(json!({"title": "Mine", "model": "m1"})),
    )
    .await;
    let conversation_id = body_json(created).await["id"].as_str().unwrap().to_owned();

    let response = request(
        &app,
        "POST",
        "/api/chat",
        Some(&bob_token),
        Some(json!({
            "conversationId": conversation_id,
            "message": {"content": "hi"},
            "model": "m1",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn provider_failure_keeps_the_user_message() {
    let (db, _dir) = test_database().await;
    let app = test_app(db.clone(), Arc::new(StubProvider::failing()));
    let (_user, token) = seeded_user(&db, "alice").await;

    let created = request(
        &app,
        "POST",
        "/api/conversations",
        Some(&token),
        Some(json!({"title": "Chat", "model": "m1"})),
    )
    .await;
    let conversation_id = body_json(created).await["id"].as_str().unwrap().to_owned();

    let response = request(
        &app,
        "POST",
        "/api/chat",
        Some(&token),
        Some(json!({
            "conversationId": conversation_id,
            "message": {"content": "doomed turn"},
            "model": "m1",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    // No rollback: the user message stays so a retry sees intact history
    let fetched = request(
        &app,
        "GET",
        &format!("/api/conversations?id={conversation_id}"),
        Some(&token),
        None,
    )
    .await;
    let conversation = body_json(fetched).await;
    let messages = conversation["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "doomed turn");
}

#[tokio::test]
async fn responses_routes_by_model() {
    let (db, _dir) = test_database().await;
    let provider = Arc::new(StubProvider::replying("structured answer"));
    let app = test_app(db.clone(), provider.clone());
    let (_user, token) = seeded_user(&db, "alice").await;

    // Default model goes through the structured shape and reports the
    // provider's own model name
    let response = request(
        &app,
        "POST",
        "/api/responses",
        Some(&token),
        Some(json!({"input": "What is entropy?", "model": "o4-mini"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"]["content"], "structured answer");
    assert_eq!(body["usage"], 15);
    assert_eq!(body["routing"]["model"], "stub-model");
    assert_eq!(provider.shapes(), ["responses"]);

    // gpt-5-chat falls back to the chat shape and keeps the requested name
    let response = request(
        &app,
        "POST",
        "/api/responses",
        Some(&token),
        Some(json!({"input": "Hello", "model": "gpt-5-chat"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["routing"]["model"], "gpt-5-chat");
    assert_eq!(provider.shapes(), ["responses", "chat"]);
}

#[tokio::test]
async fn responses_structured_input_is_split_into_text_and_images() {
    let (db, _dir) = test_database().await;
    let app = test_app(db.clone(), Arc::new(StubProvider::replying("a cat")));
    let (_user, token) = seeded_user(&db, "alice").await;

    let response = request(
        &app,
        "POST",
        "/api/responses",
        Some(&token),
        Some(json!({
            "input": [
                {"type": "input_text", "text": "What is in this image?"},
                {"type": "input_image", "image_url": "http://x/cat.png"},
            ],
            "model": "o4-mini",
        })),
    )
    .await;
    let conversation_id = body_json(response).await["conversationId"]
        .as_str()
        .unwrap()
        .to_owned();

    let fetched = request(
        &app,
        "GET",
        &format!("/api/conversations?id={conversation_id}"),
        Some(&token),
        None,
    )
    .await;
    let conversation = body_json(fetched).await;
    assert_eq!(conversation["title"], "What is in this image?");
    let user_message = &conversation["messages"][0];
    assert_eq!(user_message["content"], "What is in this image?");
    assert_eq!(user_message["images"], json!(["http://x/cat.png"]));
}

#[tokio::test]
async fn conversations_rest_surface_round_trips() {
    let (db, _dir) = test_database().await;
    let app = test_app(db.clone(), Arc::new(StubProvider::replying("ok")));
    let (_user, token) = seeded_user(&db, "alice").await;

    // Create, list, update, stats, delete
    let created = request(
        &app,
        "POST",
        "/api/conversations",
        Some(&token),
        Some(json!({"title": "Plans", "model": "m1", "settings": {"seed": 0}})),
    )
    .await;
    assert_eq!(created.status(), StatusCode::OK);
    let created = body_json(created).await;
    assert_eq!(created["settings"], json!({"seed": 0}));
    let id = created["id"].as_str().unwrap().to_owned();

    let listed = request(&app, "GET", "/api/conversations", Some(&token), None).await;
    let listed = body_json(listed).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let updated = request(
        &app,
        "PUT",
        "/api/conversations",
        Some(&token),
        Some(json!({"id": id, "title": "Renamed"})),
    )
    .await;
    assert_eq!(body_json(updated).await["title"], "Renamed");

    let stats = request(&app, "GET", "/api/conversations?stats=true", Some(&token), None).await;
    let stats = body_json(stats).await;
    assert_eq!(stats["totalConversations"], 1);
    assert_eq!(stats["totalMessages"], 0);
    assert_eq!(stats["modelsUsed"], json!(["m1"]));

    let deleted = request(
        &app,
        "DELETE",
        &format!("/api/conversations?id={id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body_json(deleted).await, json!({"success": true}));

    // Idempotent: deleting again still succeeds
    let deleted = request(
        &app,
        "DELETE",
        &format!("/api/conversations?id={id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body_json(deleted).await, json!({"success": true}));

    let missing = request(
        &app,
        "GET",
        &format!("/api/conversations?id={id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let (db, _dir) = test_database().await;
    let app = test_app(db, Arc::new(StubProvider::replying("ok")));

    for (method, uri) in [
        ("GET", "/api/conversations"),
        ("POST", "/api/chat"),
        ("POST", "/api/responses"),
    ] {
        let body = match method {
            "POST" => Some(json!({"message": {"content": "x"}, "input": "x", "model": "m"})),
            _ => None,
        };
        let response = request(&app, method, uri, None, body).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}
