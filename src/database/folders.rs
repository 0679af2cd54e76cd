// ABOUTME: Folder management database operations
// ABOUTME: Folders group plain conversations; deleting one detaches its members
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use super::conversations::now_rfc3339;
use super::Database;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

/// Database representation of a folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderRecord {
    /// Unique folder ID
    pub id: String,
    /// Owning user ID
    pub user_id: String,
    /// Folder name
    pub name: String,
    /// When the folder was created (ISO 8601)
    pub created_at: String,
    /// When the folder was last updated (ISO 8601)
    pub updated_at: String,
}

impl Database {
    /// Create the folders table
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_folders(&self) -> anyhow::Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS folders (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_folders_user ON folders(user_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Create a folder for a user
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn create_folder(&self, user_id: &str, name: &str) -> AppResult<FolderRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();

        sqlx::query(
            r"
            INSERT INTO folders (id, user_id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(&id)
        .bind(user_id)
        .bind(name)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create folder: {e}")))?;

        Ok(FolderRecord {
            id,
            user_id: user_id.to_owned(),
            name: name.to_owned(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// List a user's folders, alphabetical by name
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list_folders(&self, user_id: &str) -> AppResult<Vec<FolderRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, name, created_at, updated_at
            FROM folders
            WHERE user_id = $1
            ORDER BY name ASC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list folders: {e}")))?;

        Ok(rows.iter().map(Self::row_to_folder).collect())
    }

    /// Get one folder, scoped to its owner
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_folder(&self, id: &str, user_id: &str) -> AppResult<Option<FolderRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, name, created_at, updated_at
            FROM folders
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get folder: {e}")))?;

        Ok(row.map(|r| Self::row_to_folder(&r)))
    }

    /// Rename a folder, returning whether it existed
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn rename_folder(&self, id: &str, user_id: &str, name: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE folders
            SET name = $1, updated_at = $2
            WHERE id = $3 AND user_id = $4
            ",
        )
        .bind(name)
        .bind(now_rfc3339())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to rename folder: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a folder, detaching its conversations first
    ///
    /// Conversations survive with `folder_id` cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn delete_folder(&self, id: &str, user_id: &str) -> AppResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to start transaction: {e}")))?;

        sqlx::query("UPDATE conversations SET folder_id = NULL WHERE folder_id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to detach conversations: {e}")))?;

        let result = sqlx::query("DELETE FROM folders WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete folder: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit transaction: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    fn row_to_folder(r: &sqlx::sqlite::SqliteRow) -> FolderRecord {
        FolderRecord {
            id: r.get("id"),
            user_id: r.get("user_id"),
            name: r.get("name"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::create_test_db;
    use super::*;
    use crate::models::User;

    async fn seeded_user(db: &Database) -> String {
        let user = User::new("folders@example.com".into(), "hash".into(), None);
        db.create_user(&user).await.unwrap();
        user.id.to_string()
    }

    #[tokio::test]
    async fn test_create_and_list_folders_sorted_by_name() {
        let db = create_test_db().await.unwrap();
        let user_id = seeded_user(&db).await;

        db.create_folder(&user_id, "Work").await.unwrap();
        db.create_folder(&user_id, "Health").await.unwrap();

        let folders = db.list_folders(&user_id).await.unwrap();
        assert_eq!(folders.len(), 2);
        assert_eq!(folders[0].name, "Health");
        assert_eq!(folders[1].name, "Work");
    }

    #[tokio::test]
    async fn test_rename_folder_owner_scoped() {
        let db = create_test_db().await.unwrap();
        let user_id = seeded_user(&db).await;

        let folder = db.create_folder(&user_id, "Drafts").await.unwrap();
        assert!(db.rename_folder(&folder.id, &user_id, "Notes").await.unwrap());
        assert!(!db.rename_folder(&folder.id, "intruder", "Hijack").await.unwrap());

        let fetched = db.get_folder(&folder.id, &user_id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Notes");
    }

    #[tokio::test]
    async fn test_delete_folder_detaches_conversations() {
        let db = create_test_db().await.unwrap();
        let user_id = seeded_user(&db).await;
        let manager = db.conversations();

        let folder = db.create_folder(&user_id, "Projects").await.unwrap();
        let conv = manager.create_conversation(&user_id, "Plan").await.unwrap();
        assert!(manager
            .set_conversation_folder(&conv.id, &user_id, Some(&folder.id))
            .await
            .unwrap());

        assert!(db.delete_folder(&folder.id, &user_id).await.unwrap());

        let fetched = manager.get_conversation(&conv.id, &user_id).await.unwrap().unwrap();
        assert!(fetched.folder_id.is_none());
        assert!(db.get_folder(&folder.id, &user_id).await.unwrap().is_none());
    }
}
