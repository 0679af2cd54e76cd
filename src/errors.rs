// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Unified Error Handling System
//!
//! This module provides a centralized error handling system for the Daybook server.
//! It defines standard error types, error codes, and HTTP response formatting to ensure
//! consistent error handling across all modules and APIs.
//!
//! Account-flow codes (`MISSING_FIELDS`, `EMAIL_NOT_VERIFIED`, ...) are part of the
//! wire contract: web clients match on the serialized code, not the message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::constants::error_messages;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Authentication & Authorization (1000-1999)
    /// Request carried no usable credentials
    #[serde(rename = "AUTH_REQUIRED")]
    AuthRequired = 1000,
    /// Credentials were present but rejected
    #[serde(rename = "AUTH_INVALID")]
    AuthInvalid = 1001,
    /// Token was valid once but has expired
    #[serde(rename = "AUTH_EXPIRED")]
    AuthExpired = 1002,
    /// Token structure could not be parsed
    #[serde(rename = "AUTH_MALFORMED")]
    AuthMalformed = 1003,

    // Account flows (2000-2999)
    /// Required request fields missing or empty
    #[serde(rename = "MISSING_FIELDS")]
    MissingFields = 2000,
    /// Email address fails format validation
    #[serde(rename = "INVALID_EMAIL_FORMAT")]
    InvalidEmailFormat = 2001,
    /// Password fails strength validation
    #[serde(rename = "INVALID_PASSWORD_FORMAT")]
    InvalidPasswordFormat = 2002,
    /// Registration against an existing email
    #[serde(rename = "USER_ALREADY_EXISTS")]
    UserAlreadyExists = 2003,
    /// Login against an unknown email
    #[serde(rename = "EMAIL_NOT_REGISTERED")]
    EmailNotRegistered = 2004,
    /// Login before the email was verified
    #[serde(rename = "EMAIL_NOT_VERIFIED")]
    EmailNotVerified = 2005,
    /// Login with a wrong password
    #[serde(rename = "INVALID_PASSWORD")]
    InvalidPassword = 2006,
    /// Unknown or expired one-time token
    #[serde(rename = "INVALID_TOKEN")]
    InvalidToken = 2007,

    // Validation (3000-3999)
    /// The provided input is invalid
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,
    /// A required field is missing
    #[serde(rename = "MISSING_REQUIRED_FIELD")]
    MissingRequiredField = 3001,
    /// The data format is invalid
    #[serde(rename = "INVALID_FORMAT")]
    InvalidFormat = 3002,

    // Resource Management (4000-4999)
    /// The requested resource was not found
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound = 4000,
    /// A resource with this identifier already exists
    #[serde(rename = "RESOURCE_ALREADY_EXISTS")]
    ResourceAlreadyExists = 4001,

    // External Services (5000-5999)
    /// An external service returned an error
    #[serde(rename = "EXTERNAL_SERVICE_ERROR")]
    ExternalServiceError = 5000,
    /// An external service could not be reached
    #[serde(rename = "EXTERNAL_SERVICE_UNAVAILABLE")]
    ExternalServiceUnavailable = 5001,
    /// Authentication with an external service failed
    #[serde(rename = "EXTERNAL_AUTH_FAILED")]
    ExternalAuthFailed = 5002,
    /// An external service rate limited us
    #[serde(rename = "EXTERNAL_RATE_LIMITED")]
    ExternalRateLimited = 5003,

    // Configuration (6000-6999)
    /// Configuration error encountered
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,
    /// Required configuration is missing
    #[serde(rename = "CONFIG_MISSING")]
    ConfigMissing = 6001,
    /// Configuration is invalid
    #[serde(rename = "CONFIG_INVALID")]
    ConfigInvalid = 6002,

    // Internal Errors (9000-9999)
    /// An internal server error occurred
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    /// Database operation failed
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError = 9001,
    /// Data serialization or deserialization failed
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9002,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::MissingFields
            | Self::InvalidEmailFormat
            | Self::InvalidPasswordFormat
            | Self::InvalidToken
            | Self::InvalidInput
            | Self::MissingRequiredField
            | Self::InvalidFormat => 400,

            // 401 Unauthorized
            Self::AuthRequired
            | Self::AuthInvalid
            | Self::EmailNotRegistered
            | Self::InvalidPassword => 401,

            // 403 Forbidden
            Self::AuthExpired | Self::AuthMalformed | Self::EmailNotVerified => 403,

            // 404 Not Found
            Self::ResourceNotFound => 404,

            // 409 Conflict
            Self::UserAlreadyExists | Self::ResourceAlreadyExists => 409,

            // 502 Bad Gateway
            Self::ExternalServiceError | Self::ExternalServiceUnavailable => 502,

            // 503 Service Unavailable
            Self::ExternalAuthFailed | Self::ExternalRateLimited => 503,

            // 500 Internal Server Error
            Self::InternalError
            | Self::DatabaseError
            | Self::SerializationError
            | Self::ConfigError
            | Self::ConfigMissing
            | Self::ConfigInvalid => 500,
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::AuthRequired => "Authentication is required to access this resource",
            Self::AuthInvalid => "The provided authentication credentials are invalid",
            Self::AuthExpired => "The authentication token has expired",
            Self::AuthMalformed => "The authentication token is malformed or corrupted",
            Self::MissingFields => "Required fields are missing from the request",
            Self::InvalidEmailFormat => "The email address format is invalid",
            Self::InvalidPasswordFormat => "The password does not meet requirements",
            Self::UserAlreadyExists => "An account with this email already exists",
            Self::EmailNotRegistered => "No account is registered for this email",
            Self::EmailNotVerified => "The email address has not been verified",
            Self::InvalidPassword => "The password is incorrect",
            Self::InvalidToken => "The token is invalid or has expired",
            Self::InvalidInput => "The provided input is invalid",
            Self::MissingRequiredField => "A required field is missing from the request",
            Self::InvalidFormat => "The data format is invalid",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::ResourceAlreadyExists => "A resource with this identifier already exists",
            Self::ExternalServiceError => "An external service encountered an error",
            Self::ExternalServiceUnavailable => "An external service is currently unavailable",
            Self::ExternalAuthFailed => "Authentication with external service failed",
            Self::ExternalRateLimited => "External service rate limit exceeded",
            Self::ConfigError => "Configuration error encountered",
            Self::ConfigMissing => "Required configuration is missing",
            Self::ConfigInvalid => "Configuration is invalid",
            Self::InternalError => "An internal server error occurred",
            Self::DatabaseError => "Database operation failed",
            Self::SerializationError => "Data serialization/deserialization failed",
        }
    }
}

/// Additional context that can be attached to errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Request ID for tracing
    pub request_id: Option<String>,
    /// User ID if available
    pub user_id: Option<Uuid>,
    /// Resource ID if applicable
    pub resource_id: Option<String>,
    /// Additional key-value context
    pub details: serde_json::Value,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            request_id: None,
            user_id: None,
            resource_id: None,
            details: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    pub context: ErrorContext,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Create an `AppError` with additional context
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    /// Add a request ID to the error context
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.context.request_id = Some(request_id.into());
        self
    }

    /// Add a user ID to the error context
    #[must_use]
    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.context.user_id = Some(user_id);
        self
    }

    /// Add a resource ID to the error context
    #[must_use]
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.context.resource_id = Some(resource_id.into());
        self
    }

    /// Add details to the error context
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.context.details = details;
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error payload
    pub error: ErrorResponseDetails,
}

/// Error payload carried in HTTP error responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    /// Stable machine-readable code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Request ID for tracing, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Additional key-value context
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message: error.message,
                request_id: error.context.request_id,
                details: error.context.details,
            },
        }
    }
}

/// Axum integration: handlers can return `Result<_, AppError>` directly
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(code = ?self.code, "request failed: {}", self.message);
        }

        (status, Json(ErrorResponse::from(self))).into_response()
    }
}

/// Convenience functions for creating common errors
impl AppError {
    /// Authentication required
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "Authentication required")
    }

    /// Invalid authentication
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Authentication expired
    #[must_use]
    pub fn auth_expired() -> Self {
        Self::new(ErrorCode::AuthExpired, "Authentication token has expired")
    }

    /// Required request fields missing or empty
    #[must_use]
    pub fn missing_fields() -> Self {
        Self::new(ErrorCode::MissingFields, error_messages::MISSING_FIELDS)
    }

    /// Malformed email address
    #[must_use]
    pub fn invalid_email_format() -> Self {
        Self::new(
            ErrorCode::InvalidEmailFormat,
            error_messages::INVALID_EMAIL_FORMAT,
        )
    }

    /// Password fails strength requirements
    #[must_use]
    pub fn invalid_password_format() -> Self {
        Self::new(
            ErrorCode::InvalidPasswordFormat,
            error_messages::INVALID_PASSWORD_FORMAT,
        )
    }

    /// Registration against an existing email
    #[must_use]
    pub fn user_already_exists() -> Self {
        Self::new(
            ErrorCode::UserAlreadyExists,
            error_messages::USER_ALREADY_EXISTS,
        )
    }

    /// Login against an unknown email
    #[must_use]
    pub fn email_not_registered() -> Self {
        Self::new(
            ErrorCode::EmailNotRegistered,
            error_messages::EMAIL_NOT_REGISTERED,
        )
    }

    /// Login before the email was verified
    #[must_use]
    pub fn email_not_verified() -> Self {
        Self::new(
            ErrorCode::EmailNotVerified,
            error_messages::EMAIL_NOT_VERIFIED,
        )
    }

    /// Login with a wrong password
    #[must_use]
    pub fn invalid_password() -> Self {
        Self::new(ErrorCode::InvalidPassword, error_messages::INVALID_PASSWORD)
    }

    /// Unknown or expired one-time token
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// External service error
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalServiceError,
            format!("{}: {}", service.into(), message.into()),
        )
    }
}

/// Conversion from `anyhow::Error` to `AppError`
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        // Extract the root cause if available for better error chaining
        match error.source() {
            Some(source) => Self::new(ErrorCode::InternalError, error.to_string()).with_details(
                serde_json::json!({
                    "source": source.to_string()
                }),
            ),
            None => Self::new(ErrorCode::InternalError, error.to_string()),
        }
    }
}
