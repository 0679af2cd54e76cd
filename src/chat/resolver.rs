// ABOUTME: Chat target resolution from request fields to a concrete conversation
// ABOUTME: Handles explicit ids, day tapes, thread registration, and fresh conversations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::constants::{defaults, time_formats};
use crate::database::{ConversationManager, ConversationRecord};
use crate::errors::{AppError, AppResult};
use crate::models::MessageKind;

/// Where a chat turn should land, parsed from the request
#[derive(Debug, Clone)]
pub enum ChatTarget {
    /// Explicit conversation id
    Conversation(String),
    /// Day tape for a date (`YYYY-MM-DD`)
    Date(String),
    /// Existing thread id
    Thread(String),
    /// Register a new thread on today's day tape
    NewThread {
        /// Optional caller-provided label
        label: Option<String>,
    },
    /// No target given: start a fresh plain conversation
    Fresh,
}

/// Outcome of target resolution
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    /// Conversation the turn lands in
    pub conversation: ConversationRecord,
    /// Thread lane, when the turn belongs to a thread
    pub thread_id: Option<String>,
    /// Label carried by threaded entries
    pub thread_label: Option<String>,
}

/// Canonicalize a `YYYY-MM-DD` day string
///
/// Parsing tolerates missing zero padding ("2026-8-5"), so the parsed date
/// is formatted back to the fixed-width form before it is used as a
/// day-tape key. One calendar day always maps to one key.
///
/// # Errors
///
/// Returns `invalid_input` when the string is not a calendar date.
pub fn canonical_day(day: &str) -> AppResult<String> {
    NaiveDate::parse_from_str(day, time_formats::DAY_FORMAT)
        .map(|d| d.format(time_formats::DAY_FORMAT).to_string())
        .map_err(|_| {
            AppError::invalid_input(format!("Invalid date '{day}', expected YYYY-MM-DD"))
        })
}

/// Default label for a thread registered without one
#[must_use]
pub fn auto_thread_label(now: chrono::DateTime<Utc>) -> String {
    format!(
        "{} {}",
        defaults::THREAD_LABEL_PREFIX,
        now.format(time_formats::THREAD_LABEL_TIME_FORMAT)
    )
}

/// Resolve a chat target to the conversation the turn lands in
///
/// Explicit ids must be owned by the requester; an id that is absent or
/// owned by someone else resolves to NotFound, never to a new container.
/// Thread turns land on the day tape for `today`, creating it if needed.
/// `NewThread` registers the thread by appending its `fresh_chat` control
/// event before returning.
///
/// # Errors
///
/// Returns NotFound for unowned targets, `invalid_input` for malformed
/// dates, or a database error.
pub async fn resolve_target(
    manager: &ConversationManager,
    user_id: &str,
    target: ChatTarget,
    today: &str,
) -> AppResult<ResolvedTarget> {
    match target {
        ChatTarget::Conversation(id) => {
            let conversation = manager
                .get_conversation(&id, user_id)
                .await?
                .ok_or_else(|| AppError::not_found("Conversation"))?;
            Ok(ResolvedTarget {
                conversation,
                thread_id: None,
                thread_label: None,
            })
        }
        ChatTarget::Date(day) => {
            let day = canonical_day(&day)?;
            let conversation = manager.find_or_create_day_tape(user_id, &day).await?;
            Ok(ResolvedTarget {
                conversation,
                thread_id: None,
                thread_label: None,
            })
        }
        ChatTarget::Thread(thread_id) => {
            let summary = manager
                .get_thread_summary(user_id, &thread_id)
                .await?
                .ok_or_else(|| AppError::not_found("Thread"))?;
            let conversation = manager.find_or_create_day_tape(user_id, today).await?;
            Ok(ResolvedTarget {
                conversation,
                thread_id: Some(thread_id),
                thread_label: Some(summary.label),
            })
        }
        ChatTarget::NewThread { label } => {
            let conversation = manager.find_or_create_day_tape(user_id, today).await?;
            let thread_id = Uuid::new_v4().to_string();
            let label = label
                .map(|l| l.trim().to_owned())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| auto_thread_label(Utc::now()));

            manager
                .add_message(
                    &conversation.id,
                    MessageKind::FreshChat,
                    None,
                    "",
                    Some(&thread_id),
                    Some(&label),
                )
                .await?;

            Ok(ResolvedTarget {
                conversation,
                thread_id: Some(thread_id),
                thread_label: Some(label),
            })
        }
        ChatTarget::Fresh => {
            let conversation = manager
                .create_conversation(user_id, defaults::TITLE_PLACEHOLDER)
                .await?;
            Ok(ResolvedTarget {
                conversation,
                thread_id: None,
                thread_label: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::tests::create_test_db;
    use crate::errors::ErrorCode;
    use crate::models::User;

    async fn seeded() -> (ConversationManager, String) {
        let db = create_test_db().await.unwrap();
        let user = User::new("resolve@example.com".into(), "hash".into(), None);
        db.create_user(&user).await.unwrap();
        (db.conversations(), user.id.to_string())
    }

    #[test]
    fn test_canonical_day_normalizes_padding() {
        assert_eq!(canonical_day("2026-08-27").unwrap(), "2026-08-27");
        assert_eq!(canonical_day("2026-8-5").unwrap(), "2026-08-05");
        assert!(canonical_day("2026-13-01").is_err());
        assert!(canonical_day("yesterday").is_err());
    }

    #[test]
    fn test_auto_thread_label_format() {
        let now = chrono::DateTime::parse_from_rfc3339("2026-08-27T14:05:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(auto_thread_label(now), "Conversation 14:05");
    }

    #[tokio::test]
    async fn test_fresh_target_creates_placeholder_conversation() {
        let (manager, user_id) = seeded().await;
        let resolved = resolve_target(&manager, &user_id, ChatTarget::Fresh, "2026-08-27")
            .await
            .unwrap();
        assert_eq!(resolved.conversation.title, defaults::TITLE_PLACEHOLDER);
        assert!(resolved.thread_id.is_none());
    }

    #[tokio::test]
    async fn test_unowned_conversation_is_not_found() {
        let (manager, user_id) = seeded().await;
        let conv = manager.create_conversation(&user_id, "mine").await.unwrap();

        let err = resolve_target(
            &manager,
            "someone-else",
            ChatTarget::Conversation(conv.id),
            "2026-08-27",
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ResourceNotFound);
    }

    #[tokio::test]
    async fn test_date_target_upserts_day_tape() {
        let (manager, user_id) = seeded().await;

        let first = resolve_target(
            &manager,
            &user_id,
            ChatTarget::Date("2026-08-27".into()),
            "2026-08-27",
        )
        .await
        .unwrap();
        let second = resolve_target(
            &manager,
            &user_id,
            ChatTarget::Date("2026-08-27".into()),
            "2026-08-27",
        )
        .await
        .unwrap();

        assert_eq!(first.conversation.id, second.conversation.id);
    }

    #[tokio::test]
    async fn test_non_padded_date_resolves_to_same_tape() {
        let (manager, user_id) = seeded().await;

        let padded = resolve_target(
            &manager,
            &user_id,
            ChatTarget::Date("2026-08-05".into()),
            "2026-08-27",
        )
        .await
        .unwrap();
        let bare = resolve_target(
            &manager,
            &user_id,
            ChatTarget::Date("2026-8-5".into()),
            "2026-08-27",
        )
        .await
        .unwrap();

        assert_eq!(padded.conversation.id, bare.conversation.id);
        assert_eq!(manager.list_day_tapes(&user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_new_thread_registers_fresh_chat_event() {
        let (manager, user_id) = seeded().await;

        let resolved = resolve_target(
            &manager,
            &user_id,
            ChatTarget::NewThread {
                label: Some("Big plans".into()),
            },
            "2026-08-27",
        )
        .await
        .unwrap();

        let thread_id = resolved.thread_id.unwrap();
        let entries = manager
            .get_thread_messages(&user_id, &thread_id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, "fresh_chat");
        assert_eq!(entries[0].thread_label.as_deref(), Some("Big plans"));
        assert_eq!(resolved.conversation.day.as_deref(), Some("2026-08-27"));
    }

    #[tokio::test]
    async fn test_existing_thread_lands_on_todays_tape() {
        let (manager, user_id) = seeded().await;

        let registered = resolve_target(
            &manager,
            &user_id,
            ChatTarget::NewThread { label: None },
            "2026-08-26",
        )
        .await
        .unwrap();
        let thread_id = registered.thread_id.unwrap();

        let resolved = resolve_target(
            &manager,
            &user_id,
            ChatTarget::Thread(thread_id.clone()),
            "2026-08-27",
        )
        .await
        .unwrap();

        assert_eq!(resolved.conversation.day.as_deref(), Some("2026-08-27"));
        assert_eq!(resolved.thread_id.as_deref(), Some(thread_id.as_str()));
    }

    #[tokio::test]
    async fn test_unknown_thread_is_not_found() {
        let (manager, user_id) = seeded().await;
        let err = resolve_target(
            &manager,
            &user_id,
            ChatTarget::Thread("no-such-thread".into()),
            "2026-08-27",
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ResourceNotFound);
    }
}
