// ABOUTME: Server configuration loaded from environment variables at startup
// ABOUTME: Covers HTTP binding, database URL, auth secret, provider credentials, and CORS origin
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

use anyhow::{Context, Result};
use std::env;
use tracing::warn;

/// Default HTTP port
const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default SQLite database URL
const DEFAULT_DATABASE_URL: &str = "sqlite:data/colloquy.db";

/// Default base URL for the LLM provider
const DEFAULT_PROVIDER_BASE_URL: &str = "https://aihubmix.com/v1";

/// Development fallback for the token-signing secret
const DEV_AUTH_SECRET: &str = "hardcoded-secret";

/// LLM provider connection settings
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible endpoint
    pub base_url: String,
    /// API key sent as a bearer token
    pub api_key: String,
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the HTTP server
    pub http_port: u16,
    /// Database connection URL
    pub database_url: String,
    /// Shared secret for signing and validating session tokens
    pub auth_secret: String,
    /// LLM provider settings
    pub provider: ProviderConfig,
    /// Exact origin allowed to send credentialed cross-origin requests.
    /// When unset the server allows any origin without credentials.
    pub allow_origin: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed
    pub fn from_env() -> Result<Self> {
        let http_port = env::var("HTTP_PORT")
            .ok()
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("Invalid HTTP_PORT value")?
            .unwrap_or(DEFAULT_HTTP_PORT);

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned());

        let auth_secret = env::var("AUTH_SECRET")
            .or_else(|_| env::var("NEXTAUTH_SECRET"))
            .unwrap_or_else(|_| {
                warn!("AUTH_SECRET not set, using development fallback secret");
                DEV_AUTH_SECRET.to_owned()
            });

        let provider = ProviderConfig {
            base_url: env::var("AIHUBMIX_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_PROVIDER_BASE_URL.to_owned()),
            api_key: env::var("AIHUBMIX_API_KEY").unwrap_or_default(),
        };

        let allow_origin = env::var("ALLOW_ORIGIN").ok().filter(|o| !o.is_empty());

        Ok(Self {
            http_port,
            database_url,
            auth_secret,
            provider,
            allow_origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_defaults_apply() {
        let config = ProviderConfig {
            base_url: DEFAULT_PROVIDER_BASE_URL.to_owned(),
            api_key: String::new(),
        };
        assert!(config.base_url.starts_with("https://"));
    }
}
