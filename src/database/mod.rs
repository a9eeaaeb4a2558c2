// ABOUTME: SQLite database handle with schema migration and typed store accessors
// ABOUTME: Opened once at startup, shared by all handlers, closed on shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

pub mod conversations;
pub mod users;

pub use conversations::ConversationStore;
pub use users::UserStore;

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Maximum pooled connections
const MAX_CONNECTIONS: u32 = 5;

/// Current timestamp in the fixed-width RFC 3339 form used for storage.
/// Microsecond precision keeps lexicographic and chronological order aligned.
#[must_use]
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Encode a timestamp in the storage form
#[must_use]
pub(crate) fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Parse a stored timestamp back into UTC
pub(crate) fn parse_rfc3339(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::serialization(format!("Invalid stored timestamp {value:?}: {e}")))
}

/// Database handle wrapping the connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the database, creating the file if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the connection fails
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::config(format!("Invalid database URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        Ok(Self { pool })
    }

    /// Create tables and indexes if they do not exist
    ///
    /// # Errors
    ///
    /// Returns an error if a migration statement fails
    pub async fn migrate(&self) -> AppResult<()> {
        let statements = [
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                needs_password_reset INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                model TEXT NOT NULL,
                settings TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                model TEXT NOT NULL,
                images TEXT,
                function_call TEXT,
                function_result TEXT,
                metadata TEXT,
                created_at TEXT NOT NULL
            )
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_conversations_user_updated
            ON conversations(user_id, updated_at DESC)
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id)
            ",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Migration failed: {e}")))?;
        }

        info!("Database schema ready");
        Ok(())
    }

    /// User account operations
    #[must_use]
    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }

    /// Conversation and message operations
    #[must_use]
    pub fn conversations(&self) -> ConversationStore {
        ConversationStore::new(self.pool.clone())
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
