// ABOUTME: User account storage over SQLite
// ABOUTME: Create, lookup by username or email, and password updates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

use super::{now_rfc3339, parse_rfc3339};
use crate::errors::{AppError, AppResult};
use crate::models::User;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// User account database operations
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    /// Create a new user store
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user account
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> AppResult<User> {
        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();

        sqlx::query(
            r"
            INSERT INTO users (id, username, email, password_hash, needs_password_reset, created_at)
            VALUES ($1, $2, $3, $4, 0, $5)
            ",
        )
        .bind(&id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create user: {e}")))?;

        Ok(User {
            id,
            username: username.to_owned(),
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            needs_password_reset: false,
            created_at: parse_rfc3339(&now)?,
        })
    }

    /// Look up a user by username or email
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn find_by_identifier(&self, identifier: &str) -> AppResult<Option<User>> {
        let row = sqlx::query(
            r"
            SELECT id, username, email, password_hash, needs_password_reset, created_at
            FROM users
            WHERE username = $1 OR email = $1
            ",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to look up user: {e}")))?;

        row.map(row_to_user).transpose()
    }

    /// Look up a user by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn find_by_id(&self, user_id: &str) -> AppResult<Option<User>> {
        let row = sqlx::query(
            r"
            SELECT id, username, email, password_hash, needs_password_reset, created_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to look up user: {e}")))?;

        row.map(row_to_user).transpose()
    }

    /// Check whether a username or email is already registered
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn identifier_taken(&self, username: &str, email: &str) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM users WHERE username = $1 OR email = $2 LIMIT 1")
            .bind(username)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to check identifier: {e}")))?;

        Ok(row.is_some())
    }

    /// Replace a user's password hash and clear any pending reset flag
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn update_password(&self, user_id: &str, password_hash: &str) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE users
            SET password_hash = $2, needs_password_reset = 0
            WHERE id = $1
            ",
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update password: {e}")))?;

        Ok(())
    }
}

fn row_to_user(row: SqliteRow) -> AppResult<User> {
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        needs_password_reset: row.get::<i64, _>("needs_password_reset") != 0,
        created_at: parse_rfc3339(row.get("created_at"))?,
    })
}
