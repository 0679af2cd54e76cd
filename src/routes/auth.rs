// ABOUTME: Authentication route handlers for registration, login, and credential recovery
// ABOUTME: Covers register, login, refresh, email verification, and password reset flows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Authentication routes
//!
//! Business logic lives on `AuthService`; `AuthRoutes` wires it into axum.
//! Verification and reset tokens are logged rather than emailed; wiring a
//! mailer is a deployment concern.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{generate_one_time_token, hash_password, verify_password};
use crate::constants::{limits, tokens};
use crate::database::OneTimeTokenKind;
use crate::errors::{AppError, AppResult};
use crate::models::User;
use crate::resources::ServerResources;

// ============================================================================
// Request/Response Types
// ============================================================================

/// User registration request
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

/// User registration response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: String,
    pub message: String,
}

/// User login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User info for login response
#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// User login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub jwt_token: String,
    pub expires_at: String,
    pub user: UserInfo,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub token: String,
}

/// Email verification request
#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// Forgot-password request
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Reset-password request
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Generic message response
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Authentication Service
// ============================================================================

/// Authentication service for business logic
#[derive(Clone)]
pub struct AuthService {
    resources: Arc<ServerResources>,
}

impl AuthService {
    #[must_use]
    pub const fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    /// Handle user registration
    ///
    /// Creates the account unverified and stores a 24h verification token.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails, the email is taken, or a
    /// database operation fails
    pub async fn register(&self, request: RegisterRequest) -> AppResult<RegisterResponse> {
        info!("User registration attempt for email: {}", request.email);

        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(AppError::missing_fields());
        }
        if !Self::is_valid_email(&request.email) {
            return Err(AppError::invalid_email_format());
        }
        if !Self::is_valid_password(&request.password) {
            return Err(AppError::invalid_password_format());
        }

        if self
            .resources
            .database
            .get_user_by_email(&request.email)
            .await
            .map_err(|e| AppError::database(format!("Failed to look up user: {e}")))?
            .is_some()
        {
            return Err(AppError::user_already_exists());
        }

        let password_hash = hash_password(request.password).await?;
        let user = User::new(request.email.clone(), password_hash, request.name);

        let user_id = self
            .resources
            .database
            .create_user(&user)
            .await
            .map_err(|e| AppError::database(format!("Failed to create user: {e}")))?;

        let verification_token = generate_one_time_token(tokens::VERIFICATION_TOKEN_BYTES);
        self.resources
            .database
            .store_one_time_token(
                user_id,
                OneTimeTokenKind::Verification,
                &verification_token,
                tokens::VERIFICATION_TOKEN_TTL_HOURS,
            )
            .await
            .map_err(|e| AppError::database(format!("Failed to store verification token: {e}")))?;

        // Logged instead of emailed; no mailer in this deployment
        info!(
            user.id = %user_id,
            "Verification token issued: {verification_token}"
        );

        Ok(RegisterResponse {
            user_id: user_id.to_string(),
            message: "Registration successful. Check the server log for your verification token."
                .into(),
        })
    }

    /// Handle user login
    ///
    /// Checks run in a fixed order: missing fields, email format, account
    /// existence, verification state, password. Verification is checked
    /// before the password so an unverified user always learns that first.
    ///
    /// # Errors
    ///
    /// Returns an error per the login taxonomy or on database failure
    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        info!("User login attempt for email: {}", request.email);

        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(AppError::missing_fields());
        }
        if !Self::is_valid_email(&request.email) {
            return Err(AppError::invalid_email_format());
        }

        let user = self
            .resources
            .database
            .get_user_by_email(&request.email)
            .await
            .map_err(|e| AppError::database(format!("Failed to look up user: {e}")))?
            .ok_or_else(AppError::email_not_registered)?;

        if !user.is_verified() {
            warn!("Login blocked for unverified user: {}", request.email);
            return Err(AppError::email_not_verified());
        }

        let is_valid = verify_password(request.password, user.password_hash.clone()).await?;
        if !is_valid {
            warn!("Invalid password for user: {}", request.email);
            return Err(AppError::invalid_password());
        }

        self.resources
            .database
            .update_last_active(user.id)
            .await
            .map_err(|e| AppError::database(format!("Failed to update last active: {e}")))?;

        let jwt_token = self.resources.auth_manager.generate_token(&user)?;
        let expires_at = chrono::Utc::now()
            + chrono::Duration::hours(self.resources.auth_manager.token_expiry_hours());

        info!("User logged in successfully: {} ({})", request.email, user.id);

        Ok(LoginResponse {
            jwt_token,
            expires_at: expires_at.to_rfc3339(),
            user: UserInfo {
                user_id: user.id.to_string(),
                email: user.email,
                display_name: user.display_name,
            },
        })
    }

    /// Handle token refresh
    ///
    /// An expired token still refreshes as long as its signature verifies;
    /// forged or malformed tokens never do.
    ///
    /// # Errors
    ///
    /// Returns an error if the presented token is not authentic or the
    /// user no longer exists
    pub async fn refresh_token(&self, request: RefreshTokenRequest) -> AppResult<LoginResponse> {
        let claims = self
            .resources
            .auth_manager
            .decode_token_claims(&request.token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|e| AppError::auth_invalid(format!("Malformed user ID in token: {e}")))?;

        let user = self
            .resources
            .database
            .get_user(user_id)
            .await
            .map_err(|e| AppError::database(format!("Failed to look up user: {e}")))?
            .ok_or_else(|| AppError::not_found("User"))?;

        let new_jwt_token = self
            .resources
            .auth_manager
            .refresh_token(&request.token, &user)?;
        let expires_at = chrono::Utc::now()
            + chrono::Duration::hours(self.resources.auth_manager.token_expiry_hours());

        self.resources
            .database
            .update_last_active(user.id)
            .await
            .map_err(|e| AppError::database(format!("Failed to update last active: {e}")))?;

        info!("Token refreshed successfully for user: {}", user.id);

        Ok(LoginResponse {
            jwt_token: new_jwt_token,
            expires_at: expires_at.to_rfc3339(),
            user: UserInfo {
                user_id: user.id.to_string(),
                email: user.email,
                display_name: user.display_name,
            },
        })
    }

    /// Consume a verification token and mark the account verified
    ///
    /// # Errors
    ///
    /// Returns an error if the token is unknown, expired, or already used
    pub async fn verify_email(&self, request: VerifyEmailRequest) -> AppResult<MessageResponse> {
        let user_id = self
            .resources
            .database
            .consume_one_time_token(OneTimeTokenKind::Verification, &request.token)
            .await
            .map_err(|e| AppError::database(format!("Failed to consume token: {e}")))?
            .ok_or_else(|| AppError::invalid_token("Invalid or expired verification token"))?;

        self.resources
            .database
            .mark_email_verified(user_id)
            .await
            .map_err(|e| AppError::database(format!("Failed to mark email verified: {e}")))?;

        info!(user.id = %user_id, "Email verified");

        Ok(MessageResponse {
            message: "Email verified. You can now log in.".into(),
        })
    }

    /// Start a password reset
    ///
    /// Always succeeds with the same message whether or not the account
    /// exists, so the endpoint cannot be used to enumerate emails.
    ///
    /// # Errors
    ///
    /// Returns an error only on database failure
    pub async fn forgot_password(
        &self,
        request: ForgotPasswordRequest,
    ) -> AppResult<MessageResponse> {
        if let Some(user) = self
            .resources
            .database
            .get_user_by_email(&request.email)
            .await
            .map_err(|e| AppError::database(format!("Failed to look up user: {e}")))?
        {
            let reset_token = generate_one_time_token(tokens::RESET_TOKEN_BYTES);
            self.resources
                .database
                .store_one_time_token(
                    user.id,
                    OneTimeTokenKind::Reset,
                    &reset_token,
                    tokens::RESET_TOKEN_TTL_HOURS,
                )
                .await
                .map_err(|e| AppError::database(format!("Failed to store reset token: {e}")))?;

            info!(user.id = %user.id, "Password reset token issued: {reset_token}");
        }

        Ok(MessageResponse {
            message: "If that email is registered, a reset token has been issued.".into(),
        })
    }

    /// Complete a password reset
    ///
    /// An invalid or expired token leaves the stored password untouched.
    ///
    /// # Errors
    ///
    /// Returns an error on validation failure, a bad token, or database
    /// failure
    pub async fn reset_password(
        &self,
        request: ResetPasswordRequest,
    ) -> AppResult<MessageResponse> {
        if request.token.trim().is_empty() || request.password.is_empty() {
            return Err(AppError::missing_fields());
        }
        if !Self::is_valid_password(&request.password) {
            return Err(AppError::invalid_password_format());
        }

        let user_id = self
            .resources
            .database
            .consume_one_time_token(OneTimeTokenKind::Reset, &request.token)
            .await
            .map_err(|e| AppError::database(format!("Failed to consume token: {e}")))?
            .ok_or_else(|| AppError::auth_invalid("Invalid or expired reset token"))?;

        let password_hash = hash_password(request.password).await?;
        self.resources
            .database
            .update_password_hash(user_id, &password_hash)
            .await
            .map_err(|e| AppError::database(format!("Failed to update password: {e}")))?;

        info!(user.id = %user_id, "Password reset completed");

        Ok(MessageResponse {
            message: "Password updated. You can now log in.".into(),
        })
    }

    /// Validate email format
    #[must_use]
    pub fn is_valid_email(email: &str) -> bool {
        if email.len() <= 5 {
            return false;
        }
        let Some(at_pos) = email.find('@') else {
            return false;
        };
        if at_pos == 0 || at_pos == email.len() - 1 {
            return false;
        }
        let domain_part = &email[at_pos + 1..];
        domain_part.contains('.')
    }

    /// Validate password strength
    #[must_use]
    pub const fn is_valid_password(password: &str) -> bool {
        password.len() >= limits::MIN_PASSWORD_LENGTH
    }
}

// ============================================================================
// Auth Routes
// ============================================================================

/// Auth routes handler
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all auth routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/auth/register", post(Self::register))
            .route("/api/auth/login", post(Self::login))
            .route("/api/auth/refresh", post(Self::refresh))
            .route("/api/auth/verify-email", post(Self::verify_email))
            .route("/api/auth/forgot-password", post(Self::forgot_password))
            .route("/api/auth/reset-password", post(Self::reset_password))
            .with_state(resources)
    }

    async fn register(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<RegisterRequest>,
    ) -> Result<Response, AppError> {
        let response = AuthService::new(resources).register(request).await?;
        Ok((StatusCode::CREATED, Json(response)).into_response())
    }

    async fn login(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<LoginRequest>,
    ) -> Result<Response, AppError> {
        let response = AuthService::new(resources).login(request).await?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    async fn refresh(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<RefreshTokenRequest>,
    ) -> Result<Response, AppError> {
        let response = AuthService::new(resources).refresh_token(request).await?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    async fn verify_email(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<VerifyEmailRequest>,
    ) -> Result<Response, AppError> {
        let response = AuthService::new(resources).verify_email(request).await?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    async fn forgot_password(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<ForgotPasswordRequest>,
    ) -> Result<Response, AppError> {
        let response = AuthService::new(resources).forgot_password(request).await?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    async fn reset_password(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<ResetPasswordRequest>,
    ) -> Result<Response, AppError> {
        let response = AuthService::new(resources).reset_password(request).await?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }
}
