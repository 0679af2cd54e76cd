// ABOUTME: Account route handlers for self-service account management
// ABOUTME: Deletes the authenticated user and all owned data in dependency order
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::delete,
    Router,
};
use std::sync::Arc;
use tracing::info;

use crate::auth::authenticate;
use crate::errors::AppError;
use crate::resources::ServerResources;

/// Account routes handler
pub struct AccountRoutes;

impl AccountRoutes {
    /// Create all account routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/account", delete(Self::delete_account))
            .with_state(resources)
    }

    /// Delete the authenticated user's account and all owned data
    async fn delete_account(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
    ) -> Result<Response, AppError> {
        let principal = authenticate(&headers, &resources.auth_manager)?;

        resources
            .database
            .delete_user_account(principal.user_id)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete account: {e}")))?;

        info!(user.id = %principal.user_id, "Account deleted");

        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
