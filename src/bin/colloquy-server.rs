// ABOUTME: Server binary - wires configuration, storage, provider client, and routes together
// ABOUTME: Serves HTTP until ctrl-c, then closes the database cleanly
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

use anyhow::{Context, Result};
use colloquy::auth::AuthManager;
use colloquy::config::ServerConfig;
use colloquy::database::Database;
use colloquy::llm::HttpProviderClient;
use colloquy::logging::LoggingConfig;
use colloquy::resources::ServerResources;
use colloquy::routes;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    LoggingConfig::from_env()
        .init()
        .context("Failed to initialize logging")?;

    let config = ServerConfig::from_env().context("Failed to load configuration")?;

    let database = Database::connect(&config.database_url)
        .await
        .context("Failed to open database")?;
    database.migrate().await.context("Migration failed")?;

    let auth = AuthManager::new(config.auth_secret.clone());
    let provider =
        Arc::new(HttpProviderClient::new(&config.provider).context("Failed to build provider client")?);

    let resources = Arc::new(ServerResources::new(database, auth, provider, config.clone()));
    let app = routes::router(resources.clone());

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    resources.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install ctrl-c handler: {e}");
        return;
    }
    info!("Shutdown signal received");
}
