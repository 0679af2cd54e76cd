// ABOUTME: Core data models and types for the Daybook journaling API
// ABOUTME: Defines User, SessionPrincipal, and the MessageKind event taxonomy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Data Models
//!
//! Core data structures shared by routes, storage, and the chat pipeline.
//!
//! ## Core Models
//!
//! - `User`: An account identified by email, with verification state
//! - `SessionPrincipal`: The authenticated identity extracted from a JWT
//! - `MessageKind`: Taxonomy of entries in the canonical message store

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// Represents a registered user account
///
/// Accounts start unverified. `email_verified_at` is set once the user
/// follows the verification link; login is refused until then.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,
    /// User email address (used for identification)
    pub email: String,
    /// Display name, defaults to the email local part
    pub display_name: Option<String>,
    /// Hashed password for authentication
    pub password_hash: String,
    /// When the email address was verified, if ever
    pub email_verified_at: Option<DateTime<Utc>>,
    /// When the user account was created
    pub created_at: DateTime<Utc>,
    /// Last time user accessed the system
    pub last_active: DateTime<Utc>,
}

impl User {
    /// Create a new unverified user
    ///
    /// When no display name is given, the local part of the email is used
    /// so new accounts never render with an empty name.
    #[must_use]
    pub fn new(email: String, password_hash: String, display_name: Option<String>) -> Self {
        let display_name = display_name
            .filter(|name| !name.trim().is_empty())
            .or_else(|| email.split('@').next().map(str::to_owned));
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            email,
            display_name,
            password_hash,
            email_verified_at: None,
            created_at: now,
            last_active: now,
        }
    }

    /// Check whether the email address has been verified
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

/// Authenticated identity carried through request handling
///
/// Built once per request from validated JWT claims. Handlers scope every
/// storage call by `user_id`; they never read identity from request bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPrincipal {
    /// Unique user identifier from the token subject
    pub user_id: Uuid,
    /// Email address from the token claims
    pub email: String,
}

impl SessionPrincipal {
    /// Create a principal from validated claims
    #[must_use]
    pub const fn new(user_id: Uuid, email: String) -> Self {
        Self { user_id, email }
    }
}

/// Taxonomy of entries in the canonical message store
///
/// Only `UserMessage` and `AiMessage` are visible to the model when a
/// completion context is assembled. `SystemNote` and `FreshChat` are
/// control entries: they shape projections (threads, day tapes) but are
/// never sent to the provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A message written by the user
    UserMessage,
    /// A completion produced by the model
    AiMessage,
    /// A server- or client-generated annotation
    SystemNote,
    /// A control entry marking the start of a new thread
    FreshChat,
}

impl MessageKind {
    /// Stable string form used for database storage
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UserMessage => "user_message",
            Self::AiMessage => "ai_message",
            Self::SystemNote => "system_note",
            Self::FreshChat => "fresh_chat",
        }
    }

    /// Whether this entry carries conversational content for the model
    #[must_use]
    pub const fn is_message_bearing(&self) -> bool {
        matches!(self, Self::UserMessage | Self::AiMessage)
    }
}

impl Display for MessageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_message" => Ok(Self::UserMessage),
            "ai_message" => Ok(Self::AiMessage),
            "system_note" => Ok(Self::SystemNote),
            "fresh_chat" => Ok(Self::FreshChat),
            other => Err(AppError::invalid_input(format!(
                "Unknown message kind: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults_display_name_to_local_part() {
        let user = User::new("ada@example.com".into(), "hash".into(), None);
        assert_eq!(user.display_name.as_deref(), Some("ada"));
        assert!(!user.is_verified());
    }

    #[test]
    fn test_new_user_keeps_explicit_display_name() {
        let user = User::new(
            "ada@example.com".into(),
            "hash".into(),
            Some("Ada L.".into()),
        );
        assert_eq!(user.display_name.as_deref(), Some("Ada L."));
    }

    #[test]
    fn test_blank_display_name_falls_back_to_local_part() {
        let user = User::new("grace@example.com".into(), "hash".into(), Some("  ".into()));
        assert_eq!(user.display_name.as_deref(), Some("grace"));
    }

    #[test]
    fn test_message_kind_round_trip() {
        for kind in [
            MessageKind::UserMessage,
            MessageKind::AiMessage,
            MessageKind::SystemNote,
            MessageKind::FreshChat,
        ] {
            assert_eq!(kind.as_str().parse::<MessageKind>().unwrap(), kind);
        }
        assert!("shout".parse::<MessageKind>().is_err());
    }

    #[test]
    fn test_only_chat_kinds_are_message_bearing() {
        assert!(MessageKind::UserMessage.is_message_bearing());
        assert!(MessageKind::AiMessage.is_message_bearing());
        assert!(!MessageKind::SystemNote.is_message_bearing());
        assert!(!MessageKind::FreshChat.is_message_bearing());
    }
}
