// ABOUTME: CORS middleware configuration for the HTTP API
// ABOUTME: Exact origin with credentials when configured, open without credentials otherwise
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

use crate::config::ServerConfig;
use http::{header::HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

/// Configure CORS for the server.
///
/// When `ALLOW_ORIGIN` names an origin, that origin alone is allowed and
/// credentialed requests are permitted so the session cookie can travel
/// cross-origin. Without it any origin is allowed but credentials are not,
/// which suits same-origin deployments behind a rewriting frontend.
pub fn setup_cors(config: &ServerConfig) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let headers = [
        HeaderName::from_static("content-type"),
        HeaderName::from_static("authorization"),
        HeaderName::from_static("accept"),
        HeaderName::from_static("origin"),
        HeaderName::from_static("x-requested-with"),
    ];

    match config
        .allow_origin
        .as_deref()
        .and_then(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "Ignoring unparseable ALLOW_ORIGIN value");
                None
            }
        }) {
        Some(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_credentials(true)
            .allow_methods(methods)
            .allow_headers(headers),
        None => CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(methods)
            .allow_headers(headers),
    }
}
