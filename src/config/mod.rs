// ABOUTME: Configuration management module for centralized server settings
// ABOUTME: Handles environment-derived config for database, auth, chat, and security
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org
//! Configuration module for the Daybook server
//!
//! This module provides centralized configuration management:
//!
//! - **Environment**: Server configuration from environment variables

/// Environment and server configuration
pub mod environment;

pub use environment::ServerConfig;
