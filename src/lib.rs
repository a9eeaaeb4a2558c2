// ABOUTME: Main library entry point for the Colloquy chat backend
// ABOUTME: Provides JWT-cookie auth, conversation storage, and LLM provider routing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

#![deny(unsafe_code)]

//! # Colloquy
//!
//! The server side of a chat application: user accounts with cookie-borne
//! JWT sessions, per-user conversation logs over SQLite, and a router that
//! forwards turns to an OpenAI-compatible LLM provider in one of two wire
//! shapes (chat completions or the structured responses API).
//!
//! ## Architecture
//!
//! - **auth / security**: HS256 session tokens and the `auth_token` cookie
//! - **database**: SQLite stores for users, conversations, and messages
//! - **llm**: provider request/response types, call-shape routing, HTTP client
//! - **services**: turn orchestration shared by the chat and responses routes
//! - **routes**: the public REST surface under `/api`
//!
//! ## Example
//!
//! ```rust,no_run
//! use colloquy::config::ServerConfig;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = ServerConfig::from_env()?;
//! println!("Listening on port {}", config.http_port);
//! # Ok(())
//! # }
//! ```

/// JWT session token management and password hashing
pub mod auth;

/// Environment-driven server configuration
pub mod config;

/// SQLite storage for users, conversations, and messages
pub mod database;

/// Unified error handling
pub mod errors;

/// LLM provider integration and call-shape routing
pub mod llm;

/// Structured logging setup
pub mod logging;

/// HTTP middleware
pub mod middleware;

/// Core domain models
pub mod models;

/// Shared server resources
pub mod resources;

/// HTTP route handlers
pub mod routes;

/// Session cookie helpers
pub mod security;

/// Turn orchestration services
pub mod services;

pub use errors::{AppError, AppResult, ErrorCode};
