// ABOUTME: Server binary wiring configuration, storage, auth, and the chat provider
// ABOUTME: Starts the Daybook HTTP API on the configured port
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Daybook Server Binary
//!
//! Starts the Daybook journaling API with user authentication, SQLite
//! storage, and an OpenAI-compatible completion provider.

use anyhow::{anyhow, Result};
use clap::Parser;
use daybook_server::{
    auth::{generate_jwt_secret, AuthManager},
    config::environment::ServerConfig,
    database::Database,
    llm::ChatProvider,
    logging,
    resources::ServerResourcesBuilder,
    server::HttpServer,
};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "daybook-server")]
#[command(about = "Daybook - AI chat journaling API")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Containers sometimes pass stray arguments; fall back to defaults
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Argument parsing failed: {e}");
            eprintln!("Using default configuration");
            Args { http_port: None }
        }
    };

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    config.validate()?;

    logging::init_from_env()?;
    info!("Starting Daybook server");
    info!("{}", config.summary());

    let database = Database::new(&config.database.url.to_connection_string()).await?;
    info!("Database initialized: {}", config.database.url);

    let jwt_secret = config.auth.jwt_secret.clone().unwrap_or_else(|| {
        warn!("JWT_SECRET not set; generated a per-process secret, sessions will not survive restart");
        generate_jwt_secret()
    });
    let auth_manager = AuthManager::new(
        jwt_secret.into_bytes(),
        config.auth.jwt_expiry_hours,
    );

    let provider = Arc::new(ChatProvider::from_env().map_err(|e| anyhow!("{e}"))?);

    let resources = ServerResourcesBuilder::new()
        .with_database(database)
        .with_auth_manager(auth_manager)
        .with_provider(provider)
        .with_config(Arc::new(config.clone()))
        .build_arc()
        .map_err(|e| anyhow!("{e}"))?;

    display_available_endpoints(&config);

    info!("Server starting on port {}", config.http_port);
    let server = HttpServer::new(resources);
    if let Err(e) = server.run(config.http_port).await {
        error!("Server error: {e}");
        return Err(e);
    }

    Ok(())
}

/// Display all available API endpoints with their ports
fn display_available_endpoints(config: &ServerConfig) {
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let port = config.http_port;

    info!("=== Available API Endpoints ===");
    display_auth_endpoints(&host, port);
    display_chat_endpoints(&host, port);
    display_journal_endpoints(&host, port);
    display_health_endpoints(&host, port);
    info!("=== End of Endpoint List ===");
}

#[allow(clippy::cognitive_complexity)]
fn display_auth_endpoints(host: &str, port: u16) {
    info!("Authentication:");
    info!("   User Registration: POST http://{host}:{port}/api/auth/register");
    info!("   User Login:        POST http://{host}:{port}/api/auth/login");
    info!("   Token Refresh:     POST http://{host}:{port}/api/auth/refresh");
    info!("   Verify Email:      POST http://{host}:{port}/api/auth/verify-email");
    info!("   Forgot Password:   POST http://{host}:{port}/api/auth/forgot-password");
    info!("   Reset Password:    POST http://{host}:{port}/api/auth/reset-password");
    info!("   Delete Account:    DELETE http://{host}:{port}/api/account");
}

#[allow(clippy::cognitive_complexity)]
fn display_chat_endpoints(host: &str, port: u16) {
    info!("Chat:");
    info!("   Send Message:      POST http://{host}:{port}/api/chat");
    info!("   Conversations:     GET  http://{host}:{port}/api/conversations");
    info!("   Conversation:      GET  http://{host}:{port}/api/conversations/{{id}}");
}

#[allow(clippy::cognitive_complexity)]
fn display_journal_endpoints(host: &str, port: u16) {
    info!("Journal:");
    info!("   Day Tapes:         GET  http://{host}:{port}/api/daytapes");
    info!("   Day Tape:          GET  http://{host}:{port}/api/daytapes/{{date}}");
    info!("   Threads:           GET  http://{host}:{port}/api/threads");
    info!("   Thread:            GET  http://{host}:{port}/api/threads/{{id}}");
    info!("   Folders:           GET  http://{host}:{port}/api/folders");
}

fn display_health_endpoints(host: &str, port: u16) {
    info!("Monitoring:");
    info!("   Liveness:          GET  http://{host}:{port}/health");
    info!("   Readiness:         GET  http://{host}:{port}/ready");
}
