// ABOUTME: Shared server resources container for dependency injection
// ABOUTME: Bundles database, auth, completion provider, and config behind one Arc
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Server Resources
//!
//! Central container for shared server dependencies. Constructed once at
//! startup and passed as `Arc<ServerResources>` to every route struct, so
//! request handling stays stateless apart from this shared handle.

use std::sync::Arc;

use crate::auth::AuthManager;
use crate::config::environment::ServerConfig;
use crate::database::Database;
use crate::llm::CompletionProvider;

/// Container for all shared server resources
pub struct ServerResources {
    /// Database connection
    pub database: Database,
    /// Authentication manager for JWT operations
    pub auth_manager: AuthManager,
    /// Completion provider backing the chat endpoint
    pub provider: Arc<dyn CompletionProvider>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl ServerResources {
    /// Create new server resources
    #[must_use]
    pub fn new(
        database: Database,
        auth_manager: AuthManager,
        provider: Arc<dyn CompletionProvider>,
        config: Arc<ServerConfig>,
    ) -> Self {
        Self {
            database,
            auth_manager,
            provider,
            config,
        }
    }
}

impl std::fmt::Debug for ServerResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerResources")
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

/// Builder for `ServerResources`
///
/// Lets startup code assemble dependencies piecemeal and fail with a clear
/// message when one is missing.
#[derive(Default)]
pub struct ServerResourcesBuilder {
    database: Option<Database>,
    auth_manager: Option<AuthManager>,
    provider: Option<Arc<dyn CompletionProvider>>,
    config: Option<Arc<ServerConfig>>,
}

impl ServerResourcesBuilder {
    /// Create a new empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database
    #[must_use]
    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    /// Set the auth manager
    #[must_use]
    pub fn with_auth_manager(mut self, auth_manager: AuthManager) -> Self {
        self.auth_manager = Some(auth_manager);
        self
    }

    /// Set the completion provider
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the configuration
    #[must_use]
    pub fn with_config(mut self, config: Arc<ServerConfig>) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the resources
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing dependency
    pub fn build(self) -> Result<ServerResources, &'static str> {
        Ok(ServerResources {
            database: self.database.ok_or("database is required")?,
            auth_manager: self.auth_manager.ok_or("auth_manager is required")?,
            provider: self.provider.ok_or("provider is required")?,
            config: self.config.ok_or("config is required")?,
        })
    }

    /// Build the resources wrapped in an `Arc`
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing dependency
    pub fn build_arc(self) -> Result<Arc<ServerResources>, &'static str> {
        self.build().map(Arc::new)
    }
}
