// ABOUTME: Database operations for conversations and day-tape containers
// ABOUTME: Handles CRUD with per-user isolation and atomic day find-or-create
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use crate::constants::defaults;
use crate::errors::{AppError, AppResult};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Fixed-width RFC 3339 timestamp so lexicographic order is chronological
pub(super) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ============================================================================
// Database Record Types
// ============================================================================

/// Database representation of a conversation
///
/// A conversation with a non-NULL `day` is a day tape; the `(user_id, day)`
/// pair is unique for those.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Unique conversation ID
    pub id: String,
    /// User ID who owns the conversation
    pub user_id: String,
    /// Conversation title (placeholder until derived or renamed)
    pub title: String,
    /// Calendar day (`YYYY-MM-DD`) when this conversation is a day tape
    pub day: Option<String>,
    /// Folder this conversation is filed under, if any
    pub folder_id: Option<String>,
    /// When the conversation was created (ISO 8601)
    pub created_at: String,
    /// When the conversation was last updated (ISO 8601)
    pub updated_at: String,
}

/// Summary of a conversation for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Conversation ID
    pub id: String,
    /// Conversation title
    pub title: String,
    /// Calendar day when this conversation is a day tape
    pub day: Option<String>,
    /// Folder this conversation is filed under, if any
    pub folder_id: Option<String>,
    /// Number of messages in the conversation
    pub message_count: i64,
    /// When the conversation was created
    pub created_at: String,
    /// When the conversation was last updated
    pub updated_at: String,
}

// ============================================================================
// Conversation Manager
// ============================================================================

/// Conversation database operations manager
pub struct ConversationManager {
    pub(super) pool: SqlitePool,
}

impl ConversationManager {
    /// Create a new conversation manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Conversation Operations
    // ========================================================================

    /// Create a new conversation
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn create_conversation(
        &self,
        user_id: &str,
        title: &str,
    ) -> AppResult<ConversationRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();

        sqlx::query(
            r"
            INSERT INTO conversations (id, user_id, title, day, folder_id, created_at, updated_at)
            VALUES ($1, $2, $3, NULL, NULL, $4, $4)
            ",
        )
        .bind(&id)
        .bind(user_id)
        .bind(title)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create conversation: {e}")))?;

        Ok(ConversationRecord {
            id,
            user_id: user_id.to_owned(),
            title: title.to_owned(),
            day: None,
            folder_id: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a conversation by ID, scoped to its owner
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn get_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> AppResult<Option<ConversationRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, title, day, folder_id, created_at, updated_at
            FROM conversations
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get conversation: {e}")))?;

        Ok(row.map(|r| Self::row_to_record(&r)))
    }

    /// List free-standing conversations for a user, most recent first
    ///
    /// Day tapes are excluded; they have their own listing.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn list_conversations(&self, user_id: &str) -> AppResult<Vec<ConversationSummary>> {
        let rows = sqlx::query(
            r"
            SELECT c.id, c.title, c.day, c.folder_id, c.created_at, c.updated_at,
                   COUNT(m.id) as message_count
            FROM conversations c
            LEFT JOIN messages m ON m.conversation_id = c.id
            WHERE c.user_id = $1 AND c.day IS NULL
            GROUP BY c.id
            ORDER BY c.updated_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list conversations: {e}")))?;

        Ok(rows.iter().map(Self::row_to_summary).collect())
    }

    /// Update conversation title, returning whether a row matched
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn update_conversation_title(
        &self,
        conversation_id: &str,
        user_id: &str,
        title: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE conversations
            SET title = $1, updated_at = $2
            WHERE id = $3 AND user_id = $4
            ",
        )
        .bind(title)
        .bind(now_rfc3339())
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update conversation title: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Derive the title from the first user message, placeholder-guarded
    ///
    /// Only fires while the title is still exactly the placeholder, so
    /// manual renames are never overwritten. Idempotent per message.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn maybe_derive_title(
        &self,
        conversation_id: &str,
        user_id: &str,
        message: &str,
    ) -> AppResult<()> {
        let derived = derive_title(message);

        sqlx::query(
            r"
            UPDATE conversations
            SET title = $1, updated_at = $2
            WHERE id = $3 AND user_id = $4 AND title = $5
            ",
        )
        .bind(&derived)
        .bind(now_rfc3339())
        .bind(conversation_id)
        .bind(user_id)
        .bind(defaults::TITLE_PLACEHOLDER)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to derive conversation title: {e}")))?;

        Ok(())
    }

    /// Move a conversation into a folder (or out, with `None`)
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn set_conversation_folder(
        &self,
        conversation_id: &str,
        user_id: &str,
        folder_id: Option<&str>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE conversations
            SET folder_id = $1, updated_at = $2
            WHERE id = $3 AND user_id = $4
            ",
        )
        .bind(folder_id)
        .bind(now_rfc3339())
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to move conversation: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a conversation and all its messages
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn delete_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> AppResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to start transaction: {e}")))?;

        sqlx::query(
            r"
            DELETE FROM messages
            WHERE conversation_id IN (
                SELECT id FROM conversations WHERE id = $1 AND user_id = $2
            )
            ",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to delete messages: {e}")))?;

        let result = sqlx::query(
            r"
            DELETE FROM conversations
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to delete conversation: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit delete: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Day Tape Operations
    // ========================================================================

    /// Atomically find or create the day tape for `(user, day)`
    ///
    /// Insert-on-conflict-refetch on the partial unique index; concurrent
    /// first-writes for one day yield exactly one row.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails or the refetch finds
    /// nothing (which would mean the unique index is missing)
    pub async fn find_or_create_day_tape(
        &self,
        user_id: &str,
        day: &str,
    ) -> AppResult<ConversationRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();

        sqlx::query(
            r"
            INSERT INTO conversations (id, user_id, title, day, folder_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NULL, $5, $5)
            ON CONFLICT(user_id, day) WHERE day IS NOT NULL DO NOTHING
            ",
        )
        .bind(&id)
        .bind(user_id)
        .bind(defaults::TITLE_PLACEHOLDER)
        .bind(day)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create day tape: {e}")))?;

        self.get_day_tape(user_id, day)
            .await?
            .ok_or_else(|| AppError::database("Day tape missing after upsert".to_owned()))
    }

    /// Get the day tape for `(user, day)`
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn get_day_tape(
        &self,
        user_id: &str,
        day: &str,
    ) -> AppResult<Option<ConversationRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, title, day, folder_id, created_at, updated_at
            FROM conversations
            WHERE user_id = $1 AND day = $2
            ",
        )
        .bind(user_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get day tape: {e}")))?;

        Ok(row.map(|r| Self::row_to_record(&r)))
    }

    /// List a user's day tapes, newest day first
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn list_day_tapes(&self, user_id: &str) -> AppResult<Vec<ConversationSummary>> {
        let rows = sqlx::query(
            r"
            SELECT c.id, c.title, c.day, c.folder_id, c.created_at, c.updated_at,
                   COUNT(m.id) as message_count
            FROM conversations c
            LEFT JOIN messages m ON m.conversation_id = c.id
            WHERE c.user_id = $1 AND c.day IS NOT NULL
            GROUP BY c.id
            ORDER BY c.day DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list day tapes: {e}")))?;

        Ok(rows.iter().map(Self::row_to_summary).collect())
    }

    /// Delete the day tape for `(user, day)` with its messages
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn delete_day_tape(&self, user_id: &str, day: &str) -> AppResult<bool> {
        match self.get_day_tape(user_id, day).await? {
            Some(tape) => self.delete_conversation(&tape.id, user_id).await,
            None => Ok(false),
        }
    }

    // ========================================================================
    // Row Mapping
    // ========================================================================

    fn row_to_record(r: &sqlx::sqlite::SqliteRow) -> ConversationRecord {
        ConversationRecord {
            id: r.get("id"),
            user_id: r.get("user_id"),
            title: r.get("title"),
            day: r.get("day"),
            folder_id: r.get("folder_id"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }

    fn row_to_summary(r: &sqlx::sqlite::SqliteRow) -> ConversationSummary {
        ConversationSummary {
            id: r.get("id"),
            title: r.get("title"),
            day: r.get("day"),
            folder_id: r.get("folder_id"),
            message_count: r.get("message_count"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

/// Derive a conversation title from its first user message
///
/// First 50 characters, with an ellipsis when truncated.
#[must_use]
pub fn derive_title(message: &str) -> String {
    let trimmed = message.trim();
    let mut title: String = trimmed
        .chars()
        .take(crate::constants::limits::TITLE_DERIVE_MAX_CHARS)
        .collect();
    if trimmed.chars().count() > crate::constants::limits::TITLE_DERIVE_MAX_CHARS {
        title.push('…');
    }
    title
}

// Migrations live on Database so mod.rs can order them with the rest
impl super::Database {
    /// Create conversation tables and indexes
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_conversations(&self) -> anyhow::Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                day TEXT,
                folder_id TEXT REFERENCES folders(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversations_user ON conversations(user_id, updated_at)",
        )
        .execute(self.pool())
        .await?;

        // DayTape uniqueness: at most one conversation per (user, day)
        sqlx::query(
            r"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_conversations_user_day
            ON conversations(user_id, day) WHERE day IS NOT NULL
            ",
        )
        .execute(self.pool())
        .await?;

        Ok(())
    }
}
