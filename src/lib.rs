// ABOUTME: Main library entry point for the Daybook journaling API
// ABOUTME: Provides REST endpoints for chat, day tapes, threads, folders, and accounts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

// Crate-level attributes:
// - recursion_limit: Increased from default 128 to 256 for complex derive macros
//   (serde, thiserror) on deeply nested types like route response payloads
// - deny(unsafe_code): Zero-tolerance unsafe policy
#![recursion_limit = "256"]
#![deny(unsafe_code)]

//! # Daybook Server
//!
//! An AI chat journaling backend. Every user message lands in exactly one
//! container: a free-standing conversation or a per-day "day tape" keyed by
//! calendar date. Threads and day tapes are projections over one canonical
//! message store, so the same entry can appear in a thread view and in the
//! day it was written.
//!
//! ## Features
//!
//! - **Chat with context**: Completions carry a bounded window of prior turns
//! - **Day tapes**: One container per user per calendar date, created on demand
//! - **Threads**: Session groupings layered over day tapes, renamable
//! - **Folders**: User-defined collections of conversations
//! - **Email-verified accounts**: Registration, verification, password reset
//!
//! ## Quick Start
//!
//! 1. Set `JWT_SECRET` and `OPENAI_API_KEY` in the environment
//! 2. Start the server with `daybook-server`
//! 3. Register a user and talk to `POST /api/chat`
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use daybook_server::config::environment::ServerConfig;
//! use daybook_server::errors::AppResult;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     // Load configuration
//!     let config = ServerConfig::from_env()?;
//!
//!     println!("Daybook server configured with port: HTTP={}",
//!              config.http_port);
//!
//!     Ok(())
//! }
//! ```

// ── Public API ──────────────────────────────────────────────────────────
// These modules are used by the binary crate (src/bin/) and integration
// tests (tests/). They must remain `pub` so external consumers can access them.

/// Authentication and session management
pub mod auth;

/// Chat context assembly and message target resolution
pub mod chat;

/// Configuration management and environment parsing
pub mod config;

/// Application constants and configuration values
pub mod constants;

/// Database abstraction and per-domain storage managers
pub mod database;

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// LLM provider abstraction for AI chat integration
pub mod llm;

/// Production logging and structured output
pub mod logging;

/// Core data models shared across routes and storage
pub mod models;

/// Shared server resources for dependency injection
pub mod resources;

/// `HTTP` routes for accounts, chat, day tapes, threads, and folders
pub mod routes;

/// `HTTP` server assembly and lifecycle
pub mod server;
