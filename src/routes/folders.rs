// ABOUTME: Folder route handlers for grouping plain conversations
// ABOUTME: Lists, creates, renames, and deletes folders; deletion detaches members
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::authenticate;
use crate::database::FolderRecord;
use crate::errors::AppError;
use crate::models::SessionPrincipal;
use crate::resources::ServerResources;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create a folder
#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
}

/// Request to rename a folder
#[derive(Debug, Deserialize)]
pub struct RenameFolderRequest {
    pub name: String,
}

/// Response for listing folders
#[derive(Debug, Serialize, Deserialize)]
pub struct FolderListResponse {
    pub folders: Vec<FolderRecord>,
    pub total: usize,
}

// ============================================================================
// Folder Routes
// ============================================================================

/// Folder routes handler
pub struct FolderRoutes;

impl FolderRoutes {
    /// Create all folder routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/folders", get(Self::list_folders))
            .route("/api/folders", post(Self::create_folder))
            .route("/api/folders/:id", patch(Self::rename_folder))
            .route("/api/folders/:id", delete(Self::delete_folder))
            .with_state(resources)
    }

    fn authenticate(
        headers: &axum::http::HeaderMap,
        resources: &Arc<ServerResources>,
    ) -> Result<SessionPrincipal, AppError> {
        authenticate(headers, &resources.auth_manager)
    }

    fn validate_name(name: &str) -> Result<&str, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::invalid_input("Folder name cannot be empty"));
        }
        Ok(name)
    }

    /// List the user's folders, alphabetical
    async fn list_folders(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;

        let folders = resources
            .database
            .list_folders(&principal.user_id.to_string())
            .await?;
        let total = folders.len();

        Ok((StatusCode::OK, Json(FolderListResponse { folders, total })).into_response())
    }

    /// Create a folder
    async fn create_folder(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Json(request): Json<CreateFolderRequest>,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;
        let name = Self::validate_name(&request.name)?;

        let folder = resources
            .database
            .create_folder(&principal.user_id.to_string(), name)
            .await?;

        Ok((StatusCode::CREATED, Json(folder)).into_response())
    }

    /// Rename a folder
    async fn rename_folder(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Path(id): Path<String>,
        Json(request): Json<RenameFolderRequest>,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;
        let name = Self::validate_name(&request.name)?;
        let user_id = principal.user_id.to_string();

        let renamed = resources.database.rename_folder(&id, &user_id, name).await?;
        if !renamed {
            return Err(AppError::not_found("Folder"));
        }

        let folder = resources
            .database
            .get_folder(&id, &user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Folder"))?;
        Ok((StatusCode::OK, Json(folder)).into_response())
    }

    /// Delete a folder, detaching its conversations
    async fn delete_folder(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;

        let deleted = resources
            .database
            .delete_folder(&id, &principal.user_id.to_string())
            .await?;
        if !deleted {
            return Err(AppError::not_found("Folder"));
        }

        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
