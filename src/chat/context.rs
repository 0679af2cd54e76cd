// ABOUTME: Completion context assembly from stored conversation history
// ABOUTME: Orders system prompt, windowed prior turns, and the new user turn
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use crate::database::MessageRecord;
use crate::llm::{ChatMessage, MessageRole};

/// Build the ordered message sequence for a completion call
///
/// `prior` must already be the bounded window of message-bearing turns,
/// oldest first (the storage layer applies the window and drops control
/// entries). The result is system prompt first, priors in order, the new
/// user turn last; it is never empty.
#[must_use]
pub fn build_context(
    system_prompt: &str,
    prior: &[MessageRecord],
    new_message: &str,
) -> Vec<ChatMessage> {
    let mut context = Vec::with_capacity(prior.len() + 2);
    context.push(ChatMessage::system(system_prompt));

    for record in prior {
        let role = match record.role.as_deref() {
            Some("assistant") => MessageRole::Assistant,
            _ => MessageRole::User,
        };
        context.push(ChatMessage::new(role, record.content.clone()));
    }

    context.push(ChatMessage::user(new_message));
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(content: &str, role: &str) -> MessageRecord {
        MessageRecord {
            id: format!("id-{content}"),
            conversation_id: "conv".into(),
            kind: if role == "assistant" {
                "ai_message".into()
            } else {
                "user_message".into()
            },
            role: Some(role.into()),
            content: content.into(),
            thread_id: None,
            thread_label: None,
            created_at: "2026-08-27T12:00:00.000000Z".into(),
        }
    }

    #[test]
    fn test_context_shape_with_full_window() {
        // Simulates 25 stored turns windowed to the most recent 20
        let prior: Vec<MessageRecord> = (6..=25)
            .map(|i| record(&format!("turn {i}"), if i % 2 == 0 { "user" } else { "assistant" }))
            .collect();

        let context = build_context("Be kind.", &prior, "today was fine");

        assert_eq!(context.len(), 22);
        assert_eq!(context[0].role, MessageRole::System);
        assert_eq!(context[0].content, "Be kind.");
        assert_eq!(context[1].content, "turn 6");
        assert_eq!(context[20].content, "turn 25");
        assert_eq!(context[21].role, MessageRole::User);
        assert_eq!(context[21].content, "today was fine");
    }

    #[test]
    fn test_context_never_empty_without_history() {
        let context = build_context("persona", &[], "first words");
        assert_eq!(context.len(), 2);
        assert_eq!(context[0].role, MessageRole::System);
        assert_eq!(context[1].role, MessageRole::User);
    }

    #[test]
    fn test_roles_map_from_stored_records() {
        let prior = vec![record("hi", "user"), record("hello", "assistant")];
        let context = build_context("persona", &prior, "next");
        assert_eq!(context[1].role, MessageRole::User);
        assert_eq!(context[2].role, MessageRole::Assistant);
    }
}
