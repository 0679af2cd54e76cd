// ABOUTME: Day tape route handlers for calendar-keyed journal containers
// ABOUTME: Lists, upserts, fetches, and deletes the one-per-day conversation rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Day tape routes
//!
//! A day tape is a conversation tagged with a `YYYY-MM-DD` day. At most one
//! exists per (user, day); creation is an upsert and repeated creates return
//! the same tape.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::authenticate;
use crate::chat::canonical_day;
use crate::constants::time_formats;
use crate::database::{ConversationSummary, MessageRecord};
use crate::errors::AppError;
use crate::models::SessionPrincipal;
use crate::resources::ServerResources;

use super::chat::ConversationMeta;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create (or fetch) a day tape
#[derive(Debug, Default, Deserialize)]
pub struct CreateDayTapeRequest {
    /// Date (`YYYY-MM-DD`); defaults to the server's current date
    #[serde(default)]
    pub date: Option<String>,
}

/// Response for listing day tapes
#[derive(Debug, Serialize, Deserialize)]
pub struct DayTapeListResponse {
    pub day_tapes: Vec<ConversationSummary>,
    pub total: usize,
}

/// Response for one day tape with its events
#[derive(Debug, Serialize, Deserialize)]
pub struct DayTapeDetailResponse {
    pub conversation: ConversationMeta,
    pub events: Vec<MessageRecord>,
}

// ============================================================================
// Day Tape Routes
// ============================================================================

/// Day tape routes handler
pub struct DayTapeRoutes;

impl DayTapeRoutes {
    /// Create all day tape routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/daytapes", get(Self::list_day_tapes))
            .route("/api/daytapes", post(Self::create_day_tape))
            .route("/api/daytapes/:date", get(Self::get_day_tape))
            .route("/api/daytapes/:date", delete(Self::delete_day_tape))
            .with_state(resources)
    }

    fn authenticate(
        headers: &axum::http::HeaderMap,
        resources: &Arc<ServerResources>,
    ) -> Result<SessionPrincipal, AppError> {
        authenticate(headers, &resources.auth_manager)
    }

    /// List the user's day tapes, newest date first
    async fn list_day_tapes(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;
        let manager = resources.database.conversations();

        let day_tapes = manager
            .list_day_tapes(&principal.user_id.to_string())
            .await?;
        let total = day_tapes.len();

        Ok((StatusCode::OK, Json(DayTapeListResponse { day_tapes, total })).into_response())
    }

    /// Get or create the day tape for a date (defaults to today)
    async fn create_day_tape(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Json(request): Json<CreateDayTapeRequest>,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;
        let manager = resources.database.conversations();

        // Canonicalize so "2026-8-5" and "2026-08-05" share one tape key
        let date = match request.date {
            Some(date) => canonical_day(&date)?,
            None => chrono::Utc::now()
                .format(time_formats::DAY_FORMAT)
                .to_string(),
        };

        let user_id = principal.user_id.to_string();
        let conversation = manager.find_or_create_day_tape(&user_id, &date).await?;
        let events = manager.get_messages(&conversation.id).await?;

        let response = DayTapeDetailResponse {
            conversation: conversation.into(),
            events,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Get a day tape with its events ascending
    async fn get_day_tape(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Path(date): Path<String>,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;
        let manager = resources.database.conversations();
        let date = canonical_day(&date)?;

        let user_id = principal.user_id.to_string();
        let conversation = manager
            .get_day_tape(&user_id, &date)
            .await?
            .ok_or_else(|| AppError::not_found("Day tape"))?;
        let events = manager.get_messages(&conversation.id).await?;

        let response = DayTapeDetailResponse {
            conversation: conversation.into(),
            events,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Delete a day tape and its events
    async fn delete_day_tape(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Path(date): Path<String>,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;
        let manager = resources.database.conversations();
        let date = canonical_day(&date)?;

        let deleted = manager
            .delete_day_tape(&principal.user_id.to_string(), &date)
            .await?;
        if !deleted {
            return Err(AppError::not_found("Day tape"));
        }

        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
