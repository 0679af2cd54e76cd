// ABOUTME: One-time token storage for email verification and password reset
// ABOUTME: Tokens are stored hashed, expire on a per-kind TTL, and are single use
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use super::Database;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Kind of one-time token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneTimeTokenKind {
    /// Email verification token (24h lifetime)
    Verification,
    /// Password reset token (1h lifetime)
    Reset,
}

impl OneTimeTokenKind {
    /// Stable string form used for database storage
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verification => "verification",
            Self::Reset => "reset",
        }
    }
}

/// Hash a plaintext token for storage; the plaintext never touches disk
fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl Database {
    /// Create the one-time token table
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_one_time_tokens(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS one_time_tokens (
                token_hash TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                kind TEXT NOT NULL CHECK (kind IN ('verification', 'reset')),
                expires_at DATETIME NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_one_time_tokens_user ON one_time_tokens(user_id, kind)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store a one-time token, replacing any previous token of this kind
    ///
    /// Only the newest token of a kind stays valid for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn store_one_time_token(
        &self,
        user_id: Uuid,
        kind: OneTimeTokenKind,
        token: &str,
        ttl_hours: i64,
    ) -> Result<DateTime<Utc>> {
        let expires_at = Utc::now() + Duration::hours(ttl_hours);
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM one_time_tokens WHERE user_id = $1 AND kind = $2")
            .bind(user_id.to_string())
            .bind(kind.as_str())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r"
            INSERT INTO one_time_tokens (token_hash, user_id, kind, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(hash_token(token))
        .bind(user_id.to_string())
        .bind(kind.as_str())
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(expires_at)
    }

    /// Consume an unexpired one-time token, returning its owner
    ///
    /// The token row is deleted on success (single use). Unknown and
    /// expired tokens both return `None` without side effects on the
    /// account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn consume_one_time_token(
        &self,
        kind: OneTimeTokenKind,
        token: &str,
    ) -> Result<Option<Uuid>> {
        let row: Option<(String,)> = sqlx::query_as(
            r"
            DELETE FROM one_time_tokens
            WHERE token_hash = $1 AND kind = $2 AND expires_at > $3
            RETURNING user_id
            ",
        )
        .bind(hash_token(token))
        .bind(kind.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((user_id,)) => Ok(Some(Uuid::parse_str(&user_id)?)),
            None => Ok(None),
        }
    }
}
