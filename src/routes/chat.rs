// ABOUTME: Chat route handlers for the journaling assistant and conversation management
// ABOUTME: Provides the chat endpoint plus conversation CRUD, all JWT-authenticated
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Chat routes
//!
//! `POST /api/chat` is the single entry point for talking to the assistant:
//! the request's optional target fields decide whether the turn lands in a
//! plain conversation, a day tape, or a thread. The rest of this module is
//! plain conversation CRUD.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::authenticate;
use crate::chat::{build_context, resolve_target, ChatTarget};
use crate::constants::{defaults, limits, time_formats};
use crate::database::{ConversationManager, ConversationRecord, ConversationSummary, MessageRecord};
use crate::errors::AppError;
use crate::llm::{ChatRequest, CompletionProvider, MessageRole};
use crate::logging::AppLogger;
use crate::models::{MessageKind, SessionPrincipal};
use crate::resources::ServerResources;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to send a chat message
///
/// At most one of `conversation_id` / `date` / `thread_id` should be set;
/// precedence is in that order when several are. With no target, a fresh
/// conversation is created. `action = "new_thread"` registers a thread on
/// today's day tape and allows an empty message.
#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    /// Message content
    #[serde(default)]
    pub message: String,
    /// Target conversation
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Target day tape date (`YYYY-MM-DD`)
    #[serde(default)]
    pub date: Option<String>,
    /// Target thread
    #[serde(default)]
    pub thread_id: Option<String>,
    /// Label for a newly registered thread
    #[serde(default)]
    pub thread_label: Option<String>,
    /// Control action (`new_thread`)
    #[serde(default)]
    pub action: Option<String>,
}

/// Conversation metadata in responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationMeta {
    pub id: String,
    pub title: String,
    pub day: Option<String>,
    pub folder_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ConversationRecord> for ConversationMeta {
    fn from(c: ConversationRecord) -> Self {
        Self {
            id: c.id,
            title: c.title,
            day: c.day,
            folder_id: c.folder_id,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Response from the chat endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    /// Conversation the turn landed in
    pub conversation: ConversationMeta,
    /// Thread lane, when threaded
    pub thread_id: Option<String>,
    /// Current thread label, when threaded
    pub thread_label: Option<String>,
    /// Updated ordered message list for the container
    pub messages: Vec<MessageRecord>,
}

/// Request to create a conversation
#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    /// Optional initial title; defaults to the placeholder
    #[serde(default)]
    pub title: Option<String>,
}

/// Request to update a conversation
///
/// `folder_id` distinguishes an absent field (filing untouched) from an
/// explicit `null` (detach from the current folder).
#[derive(Debug, Deserialize)]
pub struct UpdateConversationRequest {
    /// New title (rename)
    #[serde(default)]
    pub title: Option<String>,
    /// Folder assignment; `null` moves the conversation out of its folder
    #[serde(default, deserialize_with = "double_option")]
    pub folder_id: Option<Option<String>>,
}

/// Deserialize so a present-but-null field stays distinguishable from an
/// absent one (serde folds both into `None` for a plain `Option`)
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Response for listing conversations
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationSummary>,
    pub total: usize,
}

/// Response for a single conversation with its messages
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationDetailResponse {
    pub conversation: ConversationMeta,
    pub messages: Vec<MessageRecord>,
}

// ============================================================================
// Chat Routes
// ============================================================================

/// Chat routes handler
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/chat", post(Self::chat))
            .route("/api/conversations", get(Self::list_conversations))
            .route("/api/conversations", post(Self::create_conversation))
            .route("/api/conversations/:id", get(Self::get_conversation))
            .route("/api/conversations/:id", put(Self::update_conversation))
            .route("/api/conversations/:id", delete(Self::delete_conversation))
            .with_state(resources)
    }

    /// Authenticate the request and return the session principal
    fn authenticate(
        headers: &axum::http::HeaderMap,
        resources: &Arc<ServerResources>,
    ) -> Result<SessionPrincipal, AppError> {
        authenticate(headers, &resources.auth_manager)
    }

    /// Parse the chat target from request fields
    fn parse_target(request: &ChatMessageRequest) -> ChatTarget {
        if request.action.as_deref() == Some("new_thread") {
            return ChatTarget::NewThread {
                label: request.thread_label.clone(),
            };
        }
        if let Some(id) = &request.conversation_id {
            return ChatTarget::Conversation(id.clone());
        }
        if let Some(date) = &request.date {
            return ChatTarget::Date(date.clone());
        }
        if let Some(thread_id) = &request.thread_id {
            return ChatTarget::Thread(thread_id.clone());
        }
        ChatTarget::Fresh
    }

    /// Load the updated message list for a resolved container
    async fn container_messages(
        manager: &ConversationManager,
        user_id: &str,
        conversation_id: &str,
        thread_id: Option<&str>,
    ) -> Result<Vec<MessageRecord>, AppError> {
        match thread_id {
            Some(tid) => manager.get_thread_messages(user_id, tid).await,
            None => manager.get_messages(conversation_id).await,
        }
    }

    // ========================================================================
    // Chat Handler
    // ========================================================================

    /// Send a message to the assistant (or register a new thread)
    async fn chat(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Json(request): Json<ChatMessageRequest>,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;
        let user_id = principal.user_id.to_string();
        let manager = resources.database.conversations();

        let is_new_thread = request.action.as_deref() == Some("new_thread");
        let message = request.message.trim().to_owned();

        if message.is_empty() && !is_new_thread {
            return Err(AppError::invalid_input("Message cannot be empty"));
        }

        let today = chrono::Utc::now()
            .format(time_formats::DAY_FORMAT)
            .to_string();
        let target = Self::parse_target(&request);
        let resolved = resolve_target(&manager, &user_id, target, &today).await?;

        // Thread registration with no message is purely a control event
        if message.is_empty() {
            let messages = Self::container_messages(
                &manager,
                &user_id,
                &resolved.conversation.id,
                resolved.thread_id.as_deref(),
            )
            .await?;
            let response = ChatMessageResponse {
                conversation: resolved.conversation.into(),
                thread_id: resolved.thread_id,
                thread_label: resolved.thread_label,
                messages,
            };
            return Ok((StatusCode::OK, Json(response)).into_response());
        }

        // Window of prior turns, fetched before the new turn is stored
        let window = limits::CONTEXT_WINDOW_TURNS;
        let prior = match resolved.thread_id.as_deref() {
            Some(tid) => {
                manager
                    .get_recent_thread_messages(&user_id, tid, window)
                    .await?
            }
            None => {
                manager
                    .get_recent_messages(&resolved.conversation.id, window)
                    .await?
            }
        };

        // The user turn is persisted before the provider call and survives
        // a provider failure
        manager
            .add_message(
                &resolved.conversation.id,
                MessageKind::UserMessage,
                Some(MessageRole::User),
                &message,
                resolved.thread_id.as_deref(),
                resolved.thread_label.as_deref(),
            )
            .await?;

        manager
            .maybe_derive_title(&resolved.conversation.id, &user_id, &message)
            .await?;

        let context = build_context(&resources.config.chat.system_prompt, &prior, &message);
        let completion_request =
            ChatRequest::new(context).with_temperature(defaults::CHAT_TEMPERATURE);

        let started = std::time::Instant::now();
        let completion = resources
            .provider
            .complete(&completion_request)
            .await
            .inspect_err(|e| {
                warn!(
                    user.id = %principal.user_id,
                    "Completion failed, user turn kept: {e}"
                );
            })?;
        AppLogger::log_completion(
            &user_id,
            &completion.model,
            true,
            started.elapsed().as_millis().try_into().unwrap_or(u64::MAX),
        );

        manager
            .add_message(
                &resolved.conversation.id,
                MessageKind::AiMessage,
                Some(MessageRole::Assistant),
                &completion.content,
                resolved.thread_id.as_deref(),
                resolved.thread_label.as_deref(),
            )
            .await?;

        info!(
            user.id = %principal.user_id,
            conversation.id = %resolved.conversation.id,
            "Chat turn completed (model: {})",
            completion.model
        );

        // Re-read so the response reflects any derived title
        let conversation = manager
            .get_conversation(&resolved.conversation.id, &user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Conversation"))?;
        let messages = Self::container_messages(
            &manager,
            &user_id,
            &conversation.id,
            resolved.thread_id.as_deref(),
        )
        .await?;

        let response = ChatMessageResponse {
            conversation: conversation.into(),
            thread_id: resolved.thread_id,
            thread_label: resolved.thread_label,
            messages,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    // ========================================================================
    // Conversation Handlers
    // ========================================================================

    /// List the user's plain conversations, most recently updated first
    async fn list_conversations(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;
        let manager = resources.database.conversations();

        let conversations = manager
            .list_conversations(&principal.user_id.to_string())
            .await?;
        let total = conversations.len();

        let response = ConversationListResponse {
            conversations,
            total,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Create a conversation with the placeholder (or given) title
    async fn create_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Json(request): Json<CreateConversationRequest>,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;
        let manager = resources.database.conversations();

        let title = request
            .title
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| defaults::TITLE_PLACEHOLDER.to_owned());

        let conversation = manager
            .create_conversation(&principal.user_id.to_string(), &title)
            .await?;

        Ok((StatusCode::CREATED, Json(ConversationMeta::from(conversation))).into_response())
    }

    /// Get a conversation with its messages ascending
    async fn get_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;
        let manager = resources.database.conversations();
        let user_id = principal.user_id.to_string();

        let conversation = manager
            .get_conversation(&id, &user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Conversation"))?;
        let messages = manager.get_messages(&conversation.id).await?;

        let response = ConversationDetailResponse {
            conversation: conversation.into(),
            messages,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Rename a conversation and/or assign it to a folder
    async fn update_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Path(id): Path<String>,
        Json(request): Json<UpdateConversationRequest>,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;
        let manager = resources.database.conversations();
        let user_id = principal.user_id.to_string();

        if request.title.is_none() && request.folder_id.is_none() {
            return Err(AppError::invalid_input(
                "Provide a title and/or a folder_id to update",
            ));
        }

        if let Some(title) = &request.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(AppError::invalid_input("Title cannot be empty"));
            }
            let renamed = manager
                .update_conversation_title(&id, &user_id, title)
                .await?;
            if !renamed {
                return Err(AppError::not_found("Conversation"));
            }
        }

        if let Some(folder_id) = &request.folder_id {
            if let Some(folder_id) = folder_id {
                // Folder must exist and be owned before assignment
                resources
                    .database
                    .get_folder(folder_id, &user_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Folder"))?;
            }
            let assigned = manager
                .set_conversation_folder(&id, &user_id, folder_id.as_deref())
                .await?;
            if !assigned {
                return Err(AppError::not_found("Conversation"));
            }
        }

        let conversation = manager
            .get_conversation(&id, &user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Conversation"))?;
        Ok((StatusCode::OK, Json(ConversationMeta::from(conversation))).into_response())
    }

    /// Delete a conversation and its messages
    async fn delete_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let principal = Self::authenticate(&headers, &resources)?;
        let manager = resources.database.conversations();

        let deleted = manager
            .delete_conversation(&id, &principal.user_id.to_string())
            .await?;
        if !deleted {
            return Err(AppError::not_found("Conversation"));
        }

        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
