// ABOUTME: Route module organization for the Daybook HTTP endpoints
// ABOUTME: Provides centralized route definitions organized by domain
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Route module for the Daybook server
//!
//! This module organizes all HTTP routes by domain. Each domain module
//! contains route definitions and thin handler functions that delegate to
//! the storage and chat layers.

/// Account management routes (deletion)
pub mod account;
/// Authentication routes (register, login, refresh, verification, reset)
pub mod auth;
/// Chat endpoint and conversation CRUD routes
pub mod chat;
/// Day tape routes (calendar-keyed journal containers)
pub mod day_tapes;
/// Folder routes (conversation grouping)
pub mod folders;
/// Health check routes
pub mod health;
/// Thread routes (cross-day projections)
pub mod threads;

// Re-export main route types for convenience
pub use account::AccountRoutes;
pub use auth::{
    AuthRoutes, AuthService, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
};
pub use chat::ChatRoutes;
pub use day_tapes::DayTapeRoutes;
pub use folders::FolderRoutes;
pub use health::HealthRoutes;
pub use threads::ThreadRoutes;
