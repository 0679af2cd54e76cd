// ABOUTME: Database management for the Daybook journaling server
// ABOUTME: Wraps a SQLite pool with per-domain manager impls and startup migrations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Database Management
//!
//! This module provides database functionality for the Daybook server.
//! It handles user storage, one-time tokens, and the canonical
//! conversation/message store that day tapes and threads project over.

mod conversations;
mod folders;
mod messages;
mod tokens;
mod users;

pub use conversations::{ConversationManager, ConversationRecord, ConversationSummary};
pub use folders::FolderRecord;
pub use messages::{MessageRecord, ThreadSummary};
pub use tokens::OneTimeTokenKind;

use anyhow::Result;
use sqlx::{Pool, Sqlite, SqlitePool};

/// Database manager for user and journal storage
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or the
    /// schema migration fails
    pub async fn new(database_url: &str) -> Result<Self> {
        // Ensure SQLite creates the database file if it doesn't exist
        let is_memory = database_url.contains(":memory:");
        let connection_options = if !is_memory && database_url.starts_with("sqlite:") {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };

        // Every pooled connection to :memory: is a separate database, so
        // in-memory pools must stay at one connection
        let pool = if is_memory {
            sqlx::sqlite::SqlitePoolOptions::new()
                .max_connections(1)
                .connect(&connection_options)
                .await?
        } else {
            SqlitePool::connect(&connection_options).await?
        };

        let db = Self { pool };

        // Run migrations
        db.migrate().await?;

        Ok(db)
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Create a conversation manager sharing this database's pool
    #[must_use]
    pub fn conversations(&self) -> ConversationManager {
        ConversationManager::new(self.pool.clone())
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if any table or index creation fails
    pub async fn migrate(&self) -> Result<()> {
        // User tables
        self.migrate_users().await?;

        // One-time token tables (verification, password reset)
        self.migrate_one_time_tokens().await?;

        // Folders before conversations: conversations carry the FK
        self.migrate_folders().await?;

        // Conversation and message tables
        self.migrate_conversations().await?;
        self.migrate_messages().await?;

        Ok(())
    }
}
