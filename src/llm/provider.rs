// ABOUTME: Unified completion provider selector for runtime backend switching
// ABOUTME: Wraps concrete providers behind one type chosen from environment configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Completion Provider Selector
//!
//! One place to construct the completion backend from environment
//! configuration. Every backend Daybook supports speaks the `OpenAI`
//! chat completions protocol, so selection is about endpoint and
//! credentials rather than wire format.
//!
//! ## Example
//!
//! ```rust,no_run
//! use daybook_server::llm::{ChatMessage, ChatRequest, ChatProvider, CompletionProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), daybook_server::errors::AppError> {
//!     let provider = ChatProvider::from_env()?;
//!     let request = ChatRequest::new(vec![
//!         ChatMessage::user("Hello!"),
//!     ]);
//!     let response = provider.complete(&request).await?;
//!     println!("{}", response.content);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use tracing::info;

use super::{
    ChatRequest, ChatResponse, CompletionProvider, OpenAiCompatibleProvider,
};
use crate::errors::AppError;

/// Unified chat provider chosen at startup
///
/// Currently every supported backend is `OpenAI`-compatible; the enum
/// leaves room for protocol-distinct backends without touching call sites.
pub enum ChatProvider {
    /// `OpenAI`-compatible endpoint (hosted `OpenAI`, Ollama, vLLM)
    OpenAiCompatible(OpenAiCompatibleProvider),
}

impl ChatProvider {
    /// Create a provider from environment configuration
    ///
    /// Reads `OPENAI_BASE_URL` / `OPENAI_MODEL` / `OPENAI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_env() -> Result<Self, AppError> {
        let provider = OpenAiCompatibleProvider::from_env()?;
        info!(
            "Completion provider ready: {} (model: {})",
            provider.name(),
            provider.default_model()
        );
        Ok(Self::OpenAiCompatible(provider))
    }
}

#[async_trait]
impl CompletionProvider for ChatProvider {
    fn name(&self) -> &'static str {
        match self {
            Self::OpenAiCompatible(p) => p.name(),
        }
    }

    fn default_model(&self) -> &str {
        match self {
            Self::OpenAiCompatible(p) => p.default_model(),
        }
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        match self {
            Self::OpenAiCompatible(p) => p.complete(request).await,
        }
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        match self {
            Self::OpenAiCompatible(p) => p.health_check().await,
        }
    }
}
