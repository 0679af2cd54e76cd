// ABOUTME: User management database operations
// ABOUTME: Handles user registration, verification state, and account deletion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use super::Database;
use crate::models::User;
use anyhow::{anyhow, Result};
use sqlx::Row;
use uuid::Uuid;

impl Database {
    /// Create the users table
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_users(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                display_name TEXT,
                password_hash TEXT NOT NULL,
                email_verified_at DATETIME,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                last_active DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Create a user
    ///
    /// # Errors
    ///
    /// Returns an error if the email is already in use or the database
    /// operation fails
    pub async fn create_user(&self, user: &User) -> Result<Uuid> {
        let existing = self.get_user_by_email(&user.email).await?;
        if existing.is_some() {
            return Err(anyhow!("Email already in use by another user"));
        }

        sqlx::query(
            r"
            INSERT INTO users (
                id, email, display_name, password_hash, email_verified_at,
                created_at, last_active
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(user.email_verified_at)
        .bind(user.created_at)
        .bind(user.last_active)
        .execute(&self.pool)
        .await?;

        Ok(user.id)
    }

    /// Get a user by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        self.get_user_impl("id", &user_id.to_string()).await
    }

    /// Get a user by email
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.get_user_impl("email", email).await
    }

    /// Internal implementation for getting a user
    async fn get_user_impl(&self, field: &str, value: &str) -> Result<Option<User>> {
        let query = format!(
            r"
            SELECT id, email, display_name, password_hash, email_verified_at,
                   created_at, last_active
            FROM users WHERE {field} = $1
            "
        );

        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            let user = Self::row_to_user(&row)?;
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Convert a database row to a User struct
    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
        let id: String = row.get("id");
        let email: String = row.get("email");
        let display_name: Option<String> = row.get("display_name");
        let password_hash: String = row.get("password_hash");
        let email_verified_at: Option<chrono::DateTime<chrono::Utc>> =
            row.get("email_verified_at");
        let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");
        let last_active: chrono::DateTime<chrono::Utc> = row.get("last_active");

        Ok(User {
            id: Uuid::parse_str(&id)?,
            email,
            display_name,
            password_hash,
            email_verified_at,
            created_at,
            last_active,
        })
    }

    /// Mark a user's email address as verified
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn mark_email_verified(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET email_verified_at = $1 WHERE id = $2")
            .bind(chrono::Utc::now())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Replace a user's password hash
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn update_password_hash(&self, user_id: Uuid, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Update user's last active timestamp
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn update_last_active(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET last_active = $1 WHERE id = $2")
            .bind(chrono::Utc::now())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Get total user count
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_user_count(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Delete a user account with all owned data
    ///
    /// Deletes in dependency order: messages of owned conversations, the
    /// conversations, folders, one-time tokens, then the user row.
    ///
    /// # Errors
    ///
    /// Returns an error if any delete fails; the transaction rolls back
    pub async fn delete_user_account(&self, user_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let id = user_id.to_string();

        sqlx::query(
            r"
            DELETE FROM messages WHERE conversation_id IN (
                SELECT id FROM conversations WHERE user_id = $1
            )
            ",
        )
        .bind(&id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM conversations WHERE user_id = $1")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM folders WHERE user_id = $1")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM one_time_tokens WHERE user_id = $1")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::create_test_db;
    use crate::models::User;

    #[tokio::test]
    async fn test_create_and_fetch_user() {
        let db = create_test_db().await.unwrap();
        let user = User::new("ada@example.com".into(), "hash".into(), None);

        let id = db.create_user(&user).await.unwrap();
        assert_eq!(id, user.id);

        let fetched = db.get_user_by_email("ada@example.com").await.unwrap();
        let fetched = fetched.unwrap();
        assert_eq!(fetched.id, user.id);
        assert!(fetched.email_verified_at.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = create_test_db().await.unwrap();
        let first = User::new("dup@example.com".into(), "hash".into(), None);
        let second = User::new("dup@example.com".into(), "hash2".into(), None);

        db.create_user(&first).await.unwrap();
        assert!(db.create_user(&second).await.is_err());
    }

    #[tokio::test]
    async fn test_mark_email_verified() {
        let db = create_test_db().await.unwrap();
        let user = User::new("v@example.com".into(), "hash".into(), None);
        db.create_user(&user).await.unwrap();

        db.mark_email_verified(user.id).await.unwrap();

        let fetched = db.get_user(user.id).await.unwrap().unwrap();
        assert!(fetched.is_verified());
    }

    #[tokio::test]
    async fn test_update_password_hash() {
        let db = create_test_db().await.unwrap();
        let user = User::new("p@example.com".into(), "old".into(), None);
        db.create_user(&user).await.unwrap();

        db.update_password_hash(user.id, "new").await.unwrap();

        let fetched = db.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.password_hash, "new");
    }

    #[tokio::test]
    async fn test_delete_user_account_removes_user() {
        let db = create_test_db().await.unwrap();
        let user = User::new("gone@example.com".into(), "hash".into(), None);
        db.create_user(&user).await.unwrap();

        db.delete_user_account(user.id).await.unwrap();
        assert!(db.get_user(user.id).await.unwrap().is_none());
        assert_eq!(db.get_user_count().await.unwrap(), 0);
    }
}
