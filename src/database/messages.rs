// ABOUTME: Database operations for messages and the thread projection
// ABOUTME: Handles append, ascending reads, bounded context windows, and thread CRUD
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use super::conversations::{now_rfc3339, ConversationManager};
use crate::errors::{AppError, AppResult};
use crate::llm::MessageRole;
use crate::models::MessageKind;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

// ============================================================================
// Database Record Types
// ============================================================================

/// Database representation of a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Unique message ID
    pub id: String,
    /// Conversation ID this message belongs to
    pub conversation_id: String,
    /// Entry kind (`user_message`, `ai_message`, `system_note`, `fresh_chat`)
    pub kind: String,
    /// Role for message-bearing kinds (`user`, `assistant`)
    pub role: Option<String>,
    /// Message content
    pub content: String,
    /// Thread this message belongs to, if any
    pub thread_id: Option<String>,
    /// Thread label carried by this message, if threaded
    pub thread_label: Option<String>,
    /// When the message was created (ISO 8601)
    pub created_at: String,
}

/// Summary of a thread projection for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSummary {
    /// Thread ID
    pub thread_id: String,
    /// Thread label (latest rename wins)
    pub label: String,
    /// Distinct days this thread is active on, ascending
    pub active_days: Vec<String>,
    /// Count of message-bearing entries
    pub message_count: i64,
    /// Timestamp of the latest entry
    pub last_activity: String,
}

// ============================================================================
// Message Operations
// ============================================================================

impl ConversationManager {
    /// Append a message to a conversation and bump its `updated_at`
    ///
    /// No reordering or deduplication; kind filtering happens when the
    /// completion context is built.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn add_message(
        &self,
        conversation_id: &str,
        kind: MessageKind,
        role: Option<MessageRole>,
        content: &str,
        thread_id: Option<&str>,
        thread_label: Option<&str>,
    ) -> AppResult<MessageRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();
        let role_str = role.map(|r| r.as_str().to_owned());

        // The insert and the recency bump commit together
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to start transaction: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO messages (id, conversation_id, kind, role, content, thread_id, thread_label, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(&id)
        .bind(conversation_id)
        .bind(kind.as_str())
        .bind(&role_str)
        .bind(content)
        .bind(thread_id)
        .bind(thread_label)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to add message: {e}")))?;

        sqlx::query(
            r"
            UPDATE conversations
            SET updated_at = $1
            WHERE id = $2
            ",
        )
        .bind(&now)
        .bind(conversation_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to update conversation timestamp: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit message: {e}")))?;

        Ok(MessageRecord {
            id,
            conversation_id: conversation_id.to_owned(),
            kind: kind.as_str().to_owned(),
            role: role_str,
            content: content.to_owned(),
            thread_id: thread_id.map(ToOwned::to_owned),
            thread_label: thread_label.map(ToOwned::to_owned),
            created_at: now,
        })
    }

    /// Get all messages for a conversation in chronological order
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn get_messages(&self, conversation_id: &str) -> AppResult<Vec<MessageRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, conversation_id, kind, role, content, thread_id, thread_label, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, rowid ASC
            ",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get messages: {e}")))?;

        Ok(rows.iter().map(Self::row_to_message).collect())
    }

    /// Get the most recent message-bearing turns of a conversation's
    /// unthreaded lane, chronological order
    ///
    /// Control entries (`system_note`, `fresh_chat`) never appear here.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn get_recent_messages(
        &self,
        conversation_id: &str,
        limit: i64,
    ) -> AppResult<Vec<MessageRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, conversation_id, kind, role, content, thread_id, thread_label, created_at
            FROM messages
            WHERE conversation_id = $1
              AND thread_id IS NULL
              AND kind IN ('user_message', 'ai_message')
            ORDER BY created_at DESC, rowid DESC
            LIMIT $2
            ",
        )
        .bind(conversation_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get recent messages: {e}")))?;

        // Reverse to get chronological order
        let mut messages: Vec<MessageRecord> = rows.iter().map(Self::row_to_message).collect();
        messages.reverse();

        Ok(messages)
    }

    /// Get the most recent message-bearing turns of a thread, spanning the
    /// user's day tapes, chronological order
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn get_recent_thread_messages(
        &self,
        user_id: &str,
        thread_id: &str,
        limit: i64,
    ) -> AppResult<Vec<MessageRecord>> {
        let rows = sqlx::query(
            r"
            SELECT m.id, m.conversation_id, m.kind, m.role, m.content,
                   m.thread_id, m.thread_label, m.created_at
            FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE c.user_id = $1
              AND m.thread_id = $2
              AND m.kind IN ('user_message', 'ai_message')
            ORDER BY m.created_at DESC, m.rowid DESC
            LIMIT $3
            ",
        )
        .bind(user_id)
        .bind(thread_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get thread messages: {e}")))?;

        let mut messages: Vec<MessageRecord> = rows.iter().map(Self::row_to_message).collect();
        messages.reverse();

        Ok(messages)
    }

    /// Get message count for a conversation
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn get_message_count(&self, conversation_id: &str) -> AppResult<i64> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) as count
            FROM messages
            WHERE conversation_id = $1
            ",
        )
        .bind(conversation_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get message count: {e}")))?;

        Ok(row.get("count"))
    }

    // ========================================================================
    // Thread Projection Operations
    // ========================================================================

    /// List a user's threads with derived attributes, latest activity first
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn list_threads(&self, user_id: &str) -> AppResult<Vec<ThreadSummary>> {
        let rows = sqlx::query(
            r"
            SELECT m.thread_id,
                   MAX(m.thread_label) as label,
                   GROUP_CONCAT(DISTINCT c.day) as active_days,
                   SUM(CASE WHEN m.kind IN ('user_message', 'ai_message') THEN 1 ELSE 0 END) as message_count,
                   MAX(m.created_at) as last_activity
            FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE c.user_id = $1 AND m.thread_id IS NOT NULL
            GROUP BY m.thread_id
            ORDER BY last_activity DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list threads: {e}")))?;

        Ok(rows.iter().map(Self::row_to_thread_summary).collect())
    }

    /// Get one thread's derived summary
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn get_thread_summary(
        &self,
        user_id: &str,
        thread_id: &str,
    ) -> AppResult<Option<ThreadSummary>> {
        let row = sqlx::query(
            r"
            SELECT m.thread_id,
                   MAX(m.thread_label) as label,
                   GROUP_CONCAT(DISTINCT c.day) as active_days,
                   SUM(CASE WHEN m.kind IN ('user_message', 'ai_message') THEN 1 ELSE 0 END) as message_count,
                   MAX(m.created_at) as last_activity
            FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE c.user_id = $1 AND m.thread_id = $2
            GROUP BY m.thread_id
            ",
        )
        .bind(user_id)
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get thread: {e}")))?;

        Ok(row.map(|r| Self::row_to_thread_summary(&r)))
    }

    /// Get all entries of a thread in chronological order
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn get_thread_messages(
        &self,
        user_id: &str,
        thread_id: &str,
    ) -> AppResult<Vec<MessageRecord>> {
        let rows = sqlx::query(
            r"
            SELECT m.id, m.conversation_id, m.kind, m.role, m.content,
                   m.thread_id, m.thread_label, m.created_at
            FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE c.user_id = $1 AND m.thread_id = $2
            ORDER BY m.created_at ASC, m.rowid ASC
            ",
        )
        .bind(user_id)
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get thread messages: {e}")))?;

        Ok(rows.iter().map(Self::row_to_message).collect())
    }

    /// Rename a thread, returning whether any entry matched
    ///
    /// The label lives on every entry of the thread, so the latest rename
    /// wins everywhere at once.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn rename_thread(
        &self,
        user_id: &str,
        thread_id: &str,
        label: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE messages
            SET thread_label = $1
            WHERE thread_id = $2
              AND conversation_id IN (SELECT id FROM conversations WHERE user_id = $3)
            ",
        )
        .bind(label)
        .bind(thread_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to rename thread: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete all entries of a thread, returning whether any matched
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn delete_thread(&self, user_id: &str, thread_id: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            DELETE FROM messages
            WHERE thread_id = $1
              AND conversation_id IN (SELECT id FROM conversations WHERE user_id = $2)
            ",
        )
        .bind(thread_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to delete thread: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Row Mapping
    // ========================================================================

    fn row_to_message(r: &sqlx::sqlite::SqliteRow) -> MessageRecord {
        MessageRecord {
            id: r.get("id"),
            conversation_id: r.get("conversation_id"),
            kind: r.get("kind"),
            role: r.get("role"),
            content: r.get("content"),
            thread_id: r.get("thread_id"),
            thread_label: r.get("thread_label"),
            created_at: r.get("created_at"),
        }
    }

    fn row_to_thread_summary(r: &sqlx::sqlite::SqliteRow) -> ThreadSummary {
        let active_days: Option<String> = r.get("active_days");
        let mut days: Vec<String> = active_days
            .unwrap_or_default()
            .split(',')
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        days.sort();

        ThreadSummary {
            thread_id: r.get("thread_id"),
            label: r
                .get::<Option<String>, _>("label")
                .unwrap_or_else(|| crate::constants::defaults::THREAD_LABEL_PREFIX.to_owned()),
            active_days: days,
            message_count: r.get("message_count"),
            last_activity: r.get("last_activity"),
        }
    }
}

// Migrations live on Database so mod.rs can order them with the rest
impl super::Database {
    /// Create message tables and indexes
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_messages(&self) -> anyhow::Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                kind TEXT NOT NULL CHECK (kind IN ('user_message', 'ai_message', 'system_note', 'fresh_chat')),
                role TEXT CHECK (role IN ('user', 'assistant')),
                content TEXT NOT NULL,
                thread_id TEXT,
                thread_label TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, created_at)",
        )
        .execute(self.pool())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_thread ON messages(thread_id)")
            .execute(self.pool())
            .await?;

        Ok(())
    }
}
