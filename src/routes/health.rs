// ABOUTME: Health check route handlers for service monitoring and status endpoints
// ABOUTME: Provides liveness and readiness endpoints for monitoring infrastructure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Health check routes
//!
//! `/health` is pure liveness; `/ready` additionally pings the database so
//! load balancers hold traffic until storage is reachable.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tracing::warn;

use crate::resources::ServerResources;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/health", get(Self::health))
            .route("/ready", get(Self::ready))
            .with_state(resources)
    }

    async fn health() -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }

    async fn ready(State(resources): State<Arc<ServerResources>>) -> Response {
        match resources.database.get_user_count().await {
            Ok(_) => (
                StatusCode::OK,
                Json(serde_json::json!({
                    "status": "ready",
                    "timestamp": chrono::Utc::now().to_rfc3339()
                })),
            )
                .into_response(),
            Err(e) => {
                warn!("Readiness check failed: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(serde_json::json!({
                        "status": "not_ready",
                        "timestamp": chrono::Utc::now().to_rfc3339()
                    })),
                )
                    .into_response()
            }
        }
    }
}
