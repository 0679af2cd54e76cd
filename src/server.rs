// ABOUTME: HTTP server assembly binding all route groups behind shared middleware
// ABOUTME: Merges domain routers, applies tracing and CORS, and serves on a TCP listener
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # HTTP Server
//!
//! Builds the full axum router from the domain route structs and serves it.
//! All request-scoped state flows through `Arc<ServerResources>`; the server
//! itself holds nothing else.

use anyhow::Result;
use axum::http::{HeaderValue, Method};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::resources::ServerResources;
use crate::routes::{
    AccountRoutes, AuthRoutes, ChatRoutes, DayTapeRoutes, FolderRoutes, HealthRoutes, ThreadRoutes,
};

/// HTTP server for the Daybook API
pub struct HttpServer {
    resources: Arc<ServerResources>,
}

impl HttpServer {
    /// Create a new HTTP server
    #[must_use]
    pub const fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    /// Build the complete router with middleware applied
    #[must_use]
    pub fn router(&self) -> Router {
        let cors = Self::cors_layer(&self.resources.config.security.cors_origins);

        Router::new()
            .merge(HealthRoutes::routes(self.resources.clone()))
            .merge(AuthRoutes::routes(self.resources.clone()))
            .merge(ChatRoutes::routes(self.resources.clone()))
            .merge(DayTapeRoutes::routes(self.resources.clone()))
            .merge(ThreadRoutes::routes(self.resources.clone()))
            .merge(FolderRoutes::routes(self.resources.clone()))
            .merge(AccountRoutes::routes(self.resources.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Configure CORS from the configured origin list
    ///
    /// An empty list or a sole "*" entry allows any origin (development);
    /// otherwise only the listed origins are allowed.
    fn cors_layer(origins: &[String]) -> CorsLayer {
        let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
            AllowOrigin::any()
        } else {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o.trim()).ok())
                .collect();
            AllowOrigin::list(parsed)
        };

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::AUTHORIZATION,
                axum::http::header::ACCEPT,
            ])
    }

    /// Run the server on the given port until the process exits
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind or the server fails
    pub async fn run(self, port: u16) -> Result<()> {
        let router = self.router();

        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
        info!("HTTP server listening on port {port}");

        axum::serve(listener, router).await?;
        Ok(())
    }
}
