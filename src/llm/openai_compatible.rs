// ABOUTME: Generic OpenAI-compatible completion provider for cloud and local endpoints
// ABOUTME: Supports OpenAI, Ollama, vLLM, and any chat-completions compatible API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # `OpenAI`-Compatible Provider
//!
//! Generic implementation for any `OpenAI`-compatible chat completions
//! endpoint. Daybook uses one endpoint at a time; the same code path serves
//! the hosted `OpenAI` API and local servers like Ollama or vLLM.
//!
//! ## Configuration
//!
//! - `OPENAI_BASE_URL`: Base URL (default: <https://api.openai.com/v1>)
//! - `OPENAI_MODEL`: Model to use (default: `gpt-4o-mini`)
//! - `OPENAI_API_KEY`: API key (optional for local servers)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use super::{ChatMessage, ChatRequest, ChatResponse, CompletionProvider, TokenUsage};
use crate::errors::{AppError, ErrorCode};

/// Environment variable for the endpoint base URL
const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Environment variable for the model name
const MODEL_ENV: &str = "OPENAI_MODEL";

/// Environment variable for the API key (optional)
const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Default base URL (hosted `OpenAI`)
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Connection timeout
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Request timeout (local inference can be slow)
const REQUEST_TIMEOUT_SECS: u64 = 300;

// ============================================================================
// API Request/Response Types (OpenAI-compatible format)
// ============================================================================

/// OpenAI-compatible API request structure
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Message structure for OpenAI-compatible API
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

impl From<&ChatMessage> for OpenAiMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str().to_owned(),
            content: msg.content.clone(),
        }
    }
}

/// OpenAI-compatible API response structure
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
    model: String,
}

/// Choice in response
#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

/// Message in response
#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

/// Usage statistics in response
#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(rename = "prompt_tokens")]
    prompt: u32,
    #[serde(rename = "completion_tokens")]
    completion: u32,
    #[serde(rename = "total_tokens")]
    total: u32,
}

/// Error response structure
#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

/// Error detail structure
#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Configuration for the `OpenAI`-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    /// Base URL for the API (e.g., <https://api.openai.com/v1>)
    pub base_url: String,
    /// API key (optional for local servers)
    pub api_key: Option<String>,
    /// Default model to use
    pub default_model: String,
    /// Provider name for display/logging
    pub provider_name: String,
}

impl Default for OpenAiCompatibleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: None,
            default_model: DEFAULT_MODEL.to_owned(),
            provider_name: "openai".to_owned(),
        }
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Generic `OpenAI`-compatible completion provider
///
/// Works with any endpoint that implements the `OpenAI` chat completions
/// API, including the hosted service, Ollama, and vLLM.
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: OpenAiCompatibleConfig,
}

impl OpenAiCompatibleProvider {
    /// Create a new provider with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create a provider from environment variables
    ///
    /// Reads:
    /// - `OPENAI_BASE_URL`: Base URL (default: hosted `OpenAI`)
    /// - `OPENAI_MODEL`: Model name (default: gpt-4o-mini)
    /// - `OPENAI_API_KEY`: API key (optional for local servers)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_env() -> Result<Self, AppError> {
        let base_url = env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        let default_model = env::var(MODEL_ENV).unwrap_or_else(|_| DEFAULT_MODEL.to_owned());
        let api_key = env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());

        // Detect local servers from well-known ports for clearer log output
        let provider_name = if base_url.contains(":11434") {
            "ollama"
        } else if base_url.contains(":8000") {
            "vllm"
        } else if base_url.contains("api.openai.com") {
            "openai"
        } else {
            "local"
        };

        let config = OpenAiCompatibleConfig {
            base_url,
            api_key,
            default_model,
            provider_name: provider_name.to_owned(),
        };

        debug!(
            "Initializing {} provider: base_url={}, model={}",
            config.provider_name, config.base_url, config.default_model
        );

        Self::new(config)
    }

    /// Build the API URL for a given endpoint
    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint
        )
    }

    /// Convert internal messages to `OpenAI` format
    fn convert_messages(messages: &[ChatMessage]) -> Vec<OpenAiMessage> {
        messages.iter().map(OpenAiMessage::from).collect()
    }

    /// Parse error response from API
    fn parse_error_response(status: reqwest::StatusCode, body: &str) -> AppError {
        if let Ok(error_response) = serde_json::from_str::<OpenAiErrorResponse>(body) {
            let error_type = error_response
                .error
                .error_type
                .unwrap_or_else(|| "unknown".to_owned());

            match status.as_u16() {
                401 | 403 => AppError::new(
                    ErrorCode::ExternalAuthFailed,
                    format!(
                        "Completion API authentication failed: {}",
                        error_response.error.message
                    ),
                ),
                429 => AppError::new(
                    ErrorCode::ExternalRateLimited,
                    "Assistant is busy right now. Please wait a moment and try again.",
                ),
                400 => AppError::invalid_input(format!(
                    "Completion API rejected the request: {}",
                    error_response.error.message
                )),
                503 => AppError::new(
                    ErrorCode::ExternalServiceUnavailable,
                    format!(
                        "Completion service unavailable: {}",
                        error_response.error.message
                    ),
                ),
                _ => AppError::external_service(
                    "CompletionApi",
                    format!("{} - {}", error_type, error_response.error.message),
                ),
            }
        } else {
            // Non-JSON error bodies are common with local servers
            match status.as_u16() {
                502..=504 => AppError::new(
                    ErrorCode::ExternalServiceUnavailable,
                    "Completion endpoint is not responding",
                ),
                _ => AppError::external_service(
                    "CompletionApi",
                    format!(
                        "API error ({}): {}",
                        status,
                        body.chars().take(200).collect::<String>()
                    ),
                ),
            }
        }
    }

    /// Add authorization header if API key is configured
    fn add_auth_header(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref api_key) = self.config.api_key {
            request.header("Authorization", format!("Bearer {api_key}"))
        } else {
            request
        }
    }

    fn connect_error(&self, e: &reqwest::Error) -> AppError {
        error!(
            "Failed to send request to {}: {}",
            self.config.provider_name, e
        );
        if e.is_connect() {
            AppError::new(
                ErrorCode::ExternalServiceUnavailable,
                format!(
                    "Cannot connect to completion endpoint at {}",
                    self.config.base_url
                ),
            )
        } else {
            AppError::external_service("CompletionApi", format!("Failed to connect: {e}"))
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &'static str {
        match self.config.provider_name.as_str() {
            "ollama" => "ollama",
            "vllm" => "vllm",
            "local" => "local",
            _ => "openai",
        }
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.model.as_deref().unwrap_or(&self.config.default_model)))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        let model = request
            .model
            .as_deref()
            .unwrap_or(&self.config.default_model);

        let converted_messages = Self::convert_messages(&request.messages);
        debug!(
            "Sending chat completion request to {} with {} messages",
            self.config.provider_name,
            converted_messages.len()
        );

        let openai_request = OpenAiRequest {
            model: model.to_owned(),
            messages: converted_messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let http_request = self
            .client
            .post(self.api_url("chat/completions"))
            .header("Content-Type", "application/json")
            .json(&openai_request);

        let response = self
            .add_auth_header(http_request)
            .send()
            .await
            .map_err(|e| self.connect_error(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!("Failed to read API response: {}", e);
            AppError::external_service("CompletionApi", format!("Failed to read response: {e}"))
        })?;

        if !status.is_success() {
            return Err(Self::parse_error_response(status, &body));
        }

        let openai_response: OpenAiResponse = serde_json::from_str(&body).map_err(|e| {
            error!(
                "Failed to parse API response: {} - body: {}",
                e,
                &body[..body.len().min(500)]
            );
            AppError::external_service("CompletionApi", format!("Failed to parse response: {e}"))
        })?;

        let choice = openai_response.choices.into_iter().next().ok_or_else(|| {
            AppError::external_service("CompletionApi", "API returned no choices")
        })?;

        let content = choice.message.content.unwrap_or_default();

        debug!(
            "Received response from {}: {} chars, finish_reason: {:?}",
            self.config.provider_name,
            content.len(),
            choice.finish_reason
        );

        Ok(ChatResponse {
            content,
            model: openai_response.model,
            usage: openai_response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt,
                completion_tokens: u.completion,
                total_tokens: u.total,
            }),
            finish_reason: choice.finish_reason,
        })
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<bool, AppError> {
        debug!(
            "Performing {} health check at {}",
            self.config.provider_name, self.config.base_url
        );

        // Models endpoint is the cheapest authenticated round trip
        let http_request = self.client.get(self.api_url("models"));

        let response = self
            .add_auth_header(http_request)
            .send()
            .await
            .map_err(|e| self.connect_error(&e))?;

        let healthy = response.status().is_success();
        if !healthy {
            warn!(
                "{} health check failed with status: {}",
                self.config.provider_name,
                response.status()
            );
        }

        Ok(healthy)
    }
}
