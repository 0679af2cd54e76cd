// ABOUTME: Application constants organized by domain
// ABOUTME: Covers context window sizing, token lifetimes, limits, and env-backed config
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Constants Module
//!
//! Application constants grouped into logical domains rather than a single
//! flat list. Environment-backed values live in [`env_config`].

use std::env;

/// Environment-based configuration
pub mod env_config {
    use super::env;

    /// Get HTTP server port from environment or default
    #[must_use]
    pub fn http_port() -> u16 {
        env::var("HTTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8081)
    }

    /// Get database URL from environment or default
    #[must_use]
    pub fn database_url() -> String {
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:./data/daybook.db".into())
    }

    /// Get JWT expiry hours from environment or default
    #[must_use]
    pub fn jwt_expiry_hours() -> i64 {
        env::var("JWT_EXPIRY_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(super::limits::JWT_EXPIRY_HOURS)
    }

    /// Get the assistant system prompt from environment or default persona
    #[must_use]
    pub fn system_prompt() -> String {
        env::var("DAYBOOK_SYSTEM_PROMPT").unwrap_or_else(|_| super::defaults::SYSTEM_PROMPT.into())
    }

    /// Get log level from environment or default
    #[must_use]
    pub fn log_level() -> String {
        env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into())
    }
}

/// Request and context assembly limits
pub mod limits {
    /// Maximum prior turns included in a completion context
    pub const CONTEXT_WINDOW_TURNS: i64 = 20;
    /// Maximum characters kept when deriving a conversation title
    pub const TITLE_DERIVE_MAX_CHARS: usize = 50;
    /// Minimum accepted password length
    pub const MIN_PASSWORD_LENGTH: usize = 8;
    /// JWT expiry hours
    pub const JWT_EXPIRY_HOURS: i64 = 24;
}

/// One-time token sizes and lifetimes
pub mod tokens {
    /// Random bytes in an email verification token
    pub const VERIFICATION_TOKEN_BYTES: usize = 32;
    /// Random bytes in a password reset token
    pub const RESET_TOKEN_BYTES: usize = 32;
    /// Email verification token lifetime in hours
    pub const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;
    /// Password reset token lifetime in hours
    pub const RESET_TOKEN_TTL_HOURS: i64 = 1;
}

/// Error messages
pub mod error_messages {
    /// Required request fields are missing or empty
    pub const MISSING_FIELDS: &str = "Email and password are required";
    /// Invalid email format
    pub const INVALID_EMAIL_FORMAT: &str = "Invalid email format";
    /// Password too weak
    pub const INVALID_PASSWORD_FORMAT: &str = "Password does not meet requirements";
    /// User already exists
    pub const USER_ALREADY_EXISTS: &str = "User with this email already exists";
    /// No account for the given email
    pub const EMAIL_NOT_REGISTERED: &str = "No account found for this email";
    /// Account exists but email is unverified
    pub const EMAIL_NOT_VERIFIED: &str = "Email address has not been verified";
    /// Wrong password for an existing, verified account
    pub const INVALID_PASSWORD: &str = "Invalid password";
}

/// Default values
pub mod defaults {
    /// Title given to a conversation before the first user message names it
    pub const TITLE_PLACEHOLDER: &str = "New conversation";
    /// Prefix for auto-generated thread labels ("Conversation HH:MM")
    pub const THREAD_LABEL_PREFIX: &str = "Conversation";
    /// Sampling temperature for completion requests
    pub const CHAT_TEMPERATURE: f32 = 1.0;
    /// Default assistant persona, overridable via `DAYBOOK_SYSTEM_PROMPT`
    pub const SYSTEM_PROMPT: &str = "You are Daybook, a warm and attentive journaling \
        companion. Help the user capture their day, reflect on what happened, and untangle \
        their thoughts. Be concise, curious, and encouraging. Answer in the language the \
        user writes in.";
}

/// Date and time formats
pub mod time_formats {
    /// Calendar date key for day tapes
    pub const DAY_FORMAT: &str = "%Y-%m-%d";
    /// Clock time embedded in auto-generated thread labels
    pub const THREAD_LABEL_TIME_FORMAT: &str = "%H:%M";
}

/// Service names
pub mod service_names {
    /// Daybook server service name
    pub const DAYBOOK_SERVER: &str = "daybook_server";
}
