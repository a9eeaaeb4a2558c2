// ABOUTME: Conversation and message storage with per-user ownership scoping
// ABOUTME: Messages are append-only and replayed in insertion (rowid) order
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

use super::{now_rfc3339, parse_rfc3339, to_rfc3339};
use crate::errors::{AppError, AppResult};
use crate::models::{
    Conversation, ConversationSettings, ConversationStats, Message, MessageRole,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Conversation database operations.
///
/// Every query is scoped by the owning user ID, so a conversation that exists
/// but belongs to someone else is indistinguishable from one that never
/// existed.
pub struct ConversationStore {
    pool: SqlitePool,
}

impl ConversationStore {
    /// Create a new conversation store
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new empty conversation
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn create(
        &self,
        user_id: &str,
        title: &str,
        model: &str,
        settings: &ConversationSettings,
    ) -> AppResult<Conversation> {
        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();
        let settings_json = serde_json::to_string(settings)
            .map_err(|e| AppError::serialization(format!("Failed to encode settings: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO conversations (id, user_id, title, model, settings, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ",
        )
        .bind(&id)
        .bind(user_id)
        .bind(title)
        .bind(model)
        .bind(&settings_json)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create conversation: {e}")))?;

        let created_at = parse_rfc3339(&now)?;
        Ok(Conversation {
            id,
            user_id: user_id.to_owned(),
            title: title.to_owned(),
            messages: Vec::new(),
            created_at,
            updated_at: created_at,
            model: model.to_owned(),
            settings: settings.clone(),
        })
    }

    /// Get a conversation with its messages, scoped to the owner
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get(&self, user_id: &str, conversation_id: &str) -> AppResult<Option<Conversation>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, title, model, settings, created_at, updated_at
            FROM conversations
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get conversation: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut conversation = row_to_conversation(&row)?;
        conversation.messages = self.load_messages(conversation_id).await?;
        Ok(Some(conversation))
    }

    /// List a user's conversations, most recently updated first
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list(&self, user_id: &str, limit: i64) -> AppResult<Vec<Conversation>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, title, model, settings, created_at, updated_at
            FROM conversations
            WHERE user_id = $1
            ORDER BY updated_at DESC
            LIMIT $2
            ",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list conversations: {e}")))?;

        self.hydrate(rows).await
    }

    /// Search a user's conversations by title or message content,
    /// case-insensitively, most recently updated first
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn search(
        &self,
        user_id: &str,
        query: &str,
        limit: i64,
    ) -> AppResult<Vec<Conversation>> {
        let rows = sqlx::query(
            r"
            SELECT c.id, c.user_id, c.title, c.model, c.settings, c.created_at, c.updated_at
            FROM conversations c
            WHERE c.user_id = $1
              AND (
                c.title LIKE '%' || $2 || '%'
                OR EXISTS (
                    SELECT 1 FROM messages m
                    WHERE m.conversation_id = c.id
                      AND m.content LIKE '%' || $2 || '%'
                )
              )
            ORDER BY c.updated_at DESC
            LIMIT $3
            ",
        )
        .bind(user_id)
        .bind(query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to search conversations: {e}")))?;

        self.hydrate(rows).await
    }

    /// Update a conversation's title and/or settings, refreshing `updated_at`.
    /// Returns the updated conversation, or `None` if the caller owns no such
    /// conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn update(
        &self,
        user_id: &str,
        conversation_id: &str,
        title: Option<&str>,
        settings: Option<&ConversationSettings>,
    ) -> AppResult<Option<Conversation>> {
        if self.get_header(user_id, conversation_id).await?.is_none() {
            return Ok(None);
        }

        let now = now_rfc3339();
        if let Some(title) = title {
            sqlx::query(
                "UPDATE conversations SET title = $3, updated_at = $4 WHERE id = $1 AND user_id = $2",
            )
            .bind(conversation_id)
            .bind(user_id)
            .bind(title)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update conversation: {e}")))?;
        }
        if let Some(settings) = settings {
            let settings_json = serde_json::to_string(settings)
                .map_err(|e| AppError::serialization(format!("Failed to encode settings: {e}")))?;
            sqlx::query(
                "UPDATE conversations SET settings = $3, updated_at = $4 WHERE id = $1 AND user_id = $2",
            )
            .bind(conversation_id)
            .bind(user_id)
            .bind(&settings_json)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update conversation: {e}")))?;
        }
        if title.is_none() && settings.is_none() {
            // A no-op update still refreshes the modification time
            sqlx::query(
                "UPDATE conversations SET updated_at = $3 WHERE id = $1 AND user_id = $2",
            )
            .bind(conversation_id)
            .bind(user_id)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update conversation: {e}")))?;
        }

        self.get(user_id, conversation_id).await
    }

    /// Delete a conversation and its messages. Deleting an absent or foreign
    /// conversation is a successful no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn delete(&self, user_id: &str, conversation_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM conversations WHERE id = $1 AND user_id = $2")
            .bind(conversation_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete conversation: {e}")))?;

        Ok(())
    }

    /// Append a message to an owned conversation and refresh `updated_at`.
    /// Returns `false` if the caller owns no such conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn append_message(
        &self,
        user_id: &str,
        conversation_id: &str,
        message: &Message,
    ) -> AppResult<bool> {
        if self.get_header(user_id, conversation_id).await?.is_none() {
            return Ok(false);
        }

        let images_json = message
            .images
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::serialization(format!("Failed to encode images: {e}")))?;
        let function_call_json = message
            .function_call
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::serialization(format!("Failed to encode function call: {e}")))?;
        let function_result_json = message
            .function_result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::serialization(format!("Failed to encode function result: {e}")))?;
        let metadata_json = message
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::serialization(format!("Failed to encode metadata: {e}")))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to start transaction: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO messages
                (id, conversation_id, role, content, model, images,
                 function_call, function_result, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(&message.id)
        .bind(conversation_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(&message.model)
        .bind(&images_json)
        .bind(&function_call_json)
        .bind(&function_result_json)
        .bind(&metadata_json)
        .bind(to_rfc3339(message.timestamp))
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to append message: {e}")))?;

        sqlx::query("UPDATE conversations SET updated_at = $3 WHERE id = $1 AND user_id = $2")
            .bind(conversation_id)
            .bind(user_id)
            .bind(now_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to touch conversation: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit append: {e}")))?;

        Ok(true)
    }

    /// Aggregate statistics over a user's conversations. A user with no
    /// conversations gets zeroed counts and an empty model list.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn stats(&self, user_id: &str) -> AppResult<ConversationStats> {
        let total_conversations: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM conversations WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Failed to count conversations: {e}")))?;

        let total_messages: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE c.user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to count messages: {e}")))?;

        let models_used: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT model FROM conversations WHERE user_id = $1 ORDER BY model",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to collect models: {e}")))?;

        Ok(ConversationStats {
            total_conversations,
            total_messages,
            models_used,
        })
    }

    /// Fetch the conversation row without messages
    async fn get_header(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> AppResult<Option<()>> {
        let row = sqlx::query("SELECT 1 FROM conversations WHERE id = $1 AND user_id = $2")
            .bind(conversation_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to check conversation: {e}")))?;

        Ok(row.map(|_| ()))
    }

    /// Load messages for a conversation in append order
    async fn load_messages(&self, conversation_id: &str) -> AppResult<Vec<Message>> {
        let rows = sqlx::query(
            r"
            SELECT id, role, content, model, images,
                   function_call, function_result, metadata, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY rowid
            ",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load messages: {e}")))?;

        rows.iter().map(row_to_message).collect()
    }

    /// Attach messages to a list of conversation rows
    async fn hydrate(&self, rows: Vec<SqliteRow>) -> AppResult<Vec<Conversation>> {
        let mut conversations = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut conversation = row_to_conversation(row)?;
            conversation.messages = self.load_messages(&conversation.id).await?;
            conversations.push(conversation);
        }
        Ok(conversations)
    }
}

fn row_to_conversation(row: &SqliteRow) -> AppResult<Conversation> {
    let settings: ConversationSettings = serde_json::from_str(row.get("settings"))
        .map_err(|e| AppError::serialization(format!("Invalid stored settings: {e}")))?;

    Ok(Conversation {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        messages: Vec::new(),
        created_at: parse_rfc3339(row.get("created_at"))?,
        updated_at: parse_rfc3339(row.get("updated_at"))?,
        model: row.get("model"),
        settings,
    })
}

fn row_to_message(row: &SqliteRow) -> AppResult<Message> {
    let role_str: &str = row.get("role");
    let role = MessageRole::parse(role_str)
        .ok_or_else(|| AppError::serialization(format!("Invalid stored role {role_str:?}")))?;

    let images = row
        .get::<Option<&str>, _>("images")
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| AppError::serialization(format!("Invalid stored images: {e}")))?;
    let function_call = row
        .get::<Option<&str>, _>("function_call")
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| AppError::serialization(format!("Invalid stored function call: {e}")))?;
    let function_result = row
        .get::<Option<&str>, _>("function_result")
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| AppError::serialization(format!("Invalid stored function result: {e}")))?;
    let metadata = row
        .get::<Option<&str>, _>("metadata")
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| AppError::serialization(format!("Invalid stored metadata: {e}")))?;

    Ok(Message {
        id: row.get("id"),
        role,
        content: row.get("content"),
        timestamp: parse_rfc3339(row.get("created_at"))?,
        model: row.get("model"),
        images,
        function_call,
        function_result,
        metadata,
    })
}
