// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides common database, auth, provider, and user creation helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]

//! Shared test utilities for `daybook_server`
//!
//! Common setup functions to reduce duplication across integration tests.
//! Completions are served by a scripted provider so no network is involved.

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use daybook_server::{
    auth::{generate_jwt_secret, hash_password, AuthManager},
    config::environment::{
        AuthConfig, ChatConfig, DatabaseConfig, DatabaseUrl, Environment, LogLevel, SecurityConfig,
        ServerConfig,
    },
    database::Database,
    errors::{AppError, ErrorCode},
    llm::{ChatRequest, ChatResponse, CompletionProvider},
    models::User,
    resources::ServerResources,
    server::HttpServer,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};
use uuid::Uuid;

/// Password used for all test accounts
pub const TEST_PASSWORD: &str = "correct-horse-battery";

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Completion provider that replays canned responses
///
/// Pops the next scripted reply per call; falls back to a fixed reply once
/// the script runs out, so tests can send more turns than they scripted.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(str::to_owned).collect()),
        }
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, _request: &ChatRequest) -> Result<ChatResponse, AppError> {
        let content = self
            .replies
            .lock()
            .expect("reply queue poisoned")
            .pop_front()
            .unwrap_or_else(|| "Noted.".to_owned());

        Ok(ChatResponse {
            content,
            model: "scripted-model".to_owned(),
            usage: None,
            finish_reason: Some("stop".to_owned()),
        })
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        Ok(true)
    }
}

/// Completion provider that always fails, for error-path tests
pub struct FailingProvider;

#[async_trait]
impl CompletionProvider for FailingProvider {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn default_model(&self) -> &str {
        "failing-model"
    }

    async fn complete(&self, _request: &ChatRequest) -> Result<ChatResponse, AppError> {
        Err(AppError::new(
            ErrorCode::ExternalServiceUnavailable,
            "scripted provider outage",
        ))
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        Ok(false)
    }
}

/// Standard in-memory server configuration for tests
pub fn create_test_config() -> ServerConfig {
    ServerConfig {
        http_port: 8081,
        log_level: LogLevel::Warn,
        environment: Environment::Testing,
        database: DatabaseConfig {
            url: DatabaseUrl::Memory,
            auto_migrate: true,
        },
        auth: AuthConfig {
            jwt_secret: None,
            jwt_expiry_hours: 24,
        },
        chat: ChatConfig {
            system_prompt: "You are a journaling assistant.".to_owned(),
        },
        security: SecurityConfig {
            cors_origins: vec!["*".to_owned()],
        },
    }
}

/// Build server resources backed by an in-memory database and the given provider
pub async fn create_test_resources_with_provider(
    provider: Arc<dyn CompletionProvider>,
) -> Result<Arc<ServerResources>> {
    init_test_logging();

    let database = Database::new("sqlite::memory:").await?;
    let auth_manager = AuthManager::new(generate_jwt_secret().into_bytes(), 24);
    let config = Arc::new(create_test_config());

    Ok(Arc::new(ServerResources::new(
        database,
        auth_manager,
        provider,
        config,
    )))
}

/// Build server resources with a scripted provider replaying the given replies
pub async fn create_test_resources_with_replies(
    replies: Vec<&str>,
) -> Result<Arc<ServerResources>> {
    create_test_resources_with_provider(Arc::new(ScriptedProvider::new(replies))).await
}

/// Build server resources with the default scripted provider
pub async fn create_test_resources() -> Result<Arc<ServerResources>> {
    create_test_resources_with_replies(Vec::new()).await
}

/// Build the full application router for the given resources
pub fn test_router(resources: &Arc<ServerResources>) -> Router {
    HttpServer::new(resources.clone()).router()
}

/// Create a verified user and return their id and a ready-to-use Bearer header
pub async fn create_verified_user(
    resources: &Arc<ServerResources>,
    email: &str,
) -> Result<(Uuid, String)> {
    let password_hash = hash_password(TEST_PASSWORD.to_owned()).await?;
    let user = User::new(email.to_owned(), password_hash, Some("Test User".to_owned()));
    let user_id = user.id;

    resources.database.create_user(&user).await?;
    resources.database.mark_email_verified(user_id).await?;

    let token = resources.auth_manager.generate_token(&user)?;
    Ok((user_id, format!("Bearer {token}")))
}

/// Create an unverified user directly in storage
pub async fn create_unverified_user(
    resources: &Arc<ServerResources>,
    email: &str,
) -> Result<Uuid> {
    let password_hash = hash_password(TEST_PASSWORD.to_owned()).await?;
    let user = User::new(email.to_owned(), password_hash, None);
    let user_id = user.id;

    resources.database.create_user(&user).await?;
    Ok(user_id)
}
