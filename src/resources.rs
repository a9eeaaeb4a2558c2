// ABOUTME: Shared server resources constructed once at startup
// ABOUTME: Database handle, auth manager, provider client, and configuration behind an Arc
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

use crate::auth::AuthManager;
use crate::config::ServerConfig;
use crate::database::Database;
use crate::llm::ProviderClient;
use std::sync::Arc;

/// Resources shared by all route handlers
pub struct ServerResources {
    /// Database handle
    pub database: Database,
    /// Session token manager
    pub auth: AuthManager,
    /// LLM provider client
    pub provider: Arc<dyn ProviderClient>,
    /// Server configuration
    pub config: ServerConfig,
}

impl ServerResources {
    /// Assemble the shared resources
    #[must_use]
    pub fn new(
        database: Database,
        auth: AuthManager,
        provider: Arc<dyn ProviderClient>,
        config: ServerConfig,
    ) -> Self {
        Self {
            database,
            auth,
            provider,
            config,
        }
    }

    /// Release held resources on shutdown
    pub async fn shutdown(&self) {
        self.database.close().await;
    }
}
