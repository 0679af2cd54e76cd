// ABOUTME: Thread route handlers for cross-day conversation projections
// ABOUTME: Lists, fetches, renames, and deletes threads derived from tagged messages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Thread routes
//!
//! Threads are projections over messages carrying a `thread_id`, spanning a
//! user's day tapes. There is no thread table; rename and delete operate on
//! the tagged messages directly.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::authenticate;
use crate::database::{MessageRecord, ThreadSummary};
use crate::errors::AppError;
use crate::models::SessionPrincipal;
use crate::resources::ServerResources;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to rename a thread
#[derive(Debug, Deserialize)]
pub struct RenameThreadRequest {
    pub thread_id: String,
    pub label: String,
}

/// Request to delete a thread
#[derive(Debug, Deserialize)]
pub struct DeleteThreadRequest {
    pub thread_id: String,
}

/// Response for listing threads
#[derive(Debug, Serialize, Deserialize)]
pub struct ThreadListResponse {
    pub threads: Vec<ThreadSummary>,
    pub total: usize,
}

/// Response for one thread with its entries
#[derive(Debug, Serialize, Deserialize)]
pub struct ThreadDetailResponse {
    pub thread: ThreadSummary,
    pub messages: Vec<MessageRecord>,
}

// ============================================================================
// Thread Routes
// ============================================================================

/// Thread routes handler
pub struct ThreadRoutes;

impl ThreadRoutes {
    /// Create all thread routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/threads", get(Self::list_threads))
            .route("/api/threads/rename", post(Self::rename_thread))
            .route("/api/threads/delete", post(Self::delete_thread))
            .route("/api/threads/:id", get(Self::get_thread))
            .with_state(resources)
    }

    fn authenticate(
        headers: &axum::http::HeaderMap,
        resources: &Arc<ServerResources>,
    ) -> Result<SessionPrincipal, AppError> {
        authenticate(headers, &resources.auth_manager)
    }

    /// List the user's threads, latest activity first
    async fn list_threads(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;
        let manager = resources.database.conversations();

        let threads = manager.list_threads(&principal.user_id.to_string()).await?;
        let total = threads.len();

        Ok((StatusCode::OK, Json(ThreadListResponse { threads, total })).into_response())
    }

    /// Get a thread with its entries ascending
    async fn get_thread(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;
        let manager = resources.database.conversations();
        let user_id = principal.user_id.to_string();

        let thread = manager
            .get_thread_summary(&user_id, &id)
            .await?
            .ok_or_else(|| AppError::not_found("Thread"))?;
        let messages = manager.get_thread_messages(&user_id, &id).await?;

        Ok((StatusCode::OK, Json(ThreadDetailResponse { thread, messages })).into_response())
    }

    /// Rename a thread (latest label wins everywhere)
    async fn rename_thread(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Json(request): Json<RenameThreadRequest>,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;
        let manager = resources.database.conversations();
        let user_id = principal.user_id.to_string();

        let label = request.label.trim();
        if label.is_empty() {
            return Err(AppError::invalid_input("Label cannot be empty"));
        }

        let renamed = manager
            .rename_thread(&user_id, &request.thread_id, label)
            .await?;
        if !renamed {
            return Err(AppError::not_found("Thread"));
        }

        let thread = manager
            .get_thread_summary(&user_id, &request.thread_id)
            .await?
            .ok_or_else(|| AppError::not_found("Thread"))?;
        Ok((StatusCode::OK, Json(thread)).into_response())
    }

    /// Delete a thread's entries
    async fn delete_thread(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Json(request): Json<DeleteThreadRequest>,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;
        let manager = resources.database.conversations();

        let deleted = manager
            .delete_thread(&principal.user_id.to_string(), &request.thread_id)
            .await?;
        if !deleted {
            return Err(AppError::not_found("Thread"));
        }

        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
