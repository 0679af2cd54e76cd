// ABOUTME: JWT-based user authentication and session management
// ABOUTME: Handles token generation, validation, refresh, and password hashing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Authentication and Session Management
//!
//! JWT-based session handling for the Daybook server. Tokens are signed
//! with HS256 using a process-wide secret; every protected route extracts
//! a [`SessionPrincipal`](crate::models::SessionPrincipal) from the
//! `Authorization: Bearer` header before touching storage.

use crate::constants::service_names;
use crate::errors::AppError;
use crate::models::{SessionPrincipal, User};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Convert a duration to a human-readable format
fn humanize_duration(duration: Duration) -> String {
    let total_secs = duration.num_seconds().abs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;

    if hours > 0 {
        format!("{hours} hours")
    } else if minutes > 0 {
        format!("{minutes} minutes")
    } else {
        format!("{total_secs} seconds")
    }
}

/// `JWT` validation error with detailed information
#[derive(Debug, Clone)]
pub enum JwtValidationError {
    /// Token has expired
    TokenExpired {
        /// When the token expired
        expired_at: DateTime<Utc>,
        /// Current time for reference
        current_time: DateTime<Utc>,
    },
    /// Token signature is invalid
    TokenInvalid {
        /// Reason for invalidity
        reason: String,
    },
    /// Token is malformed (not proper `JWT` format)
    TokenMalformed {
        /// Details about malformation
        details: String,
    },
}

impl std::fmt::Display for JwtValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TokenExpired {
                expired_at,
                current_time,
            } => {
                let duration_expired = current_time.signed_duration_since(*expired_at);
                write!(
                    f,
                    "JWT token expired {} ago at {}",
                    humanize_duration(duration_expired),
                    expired_at.format("%Y-%m-%d %H:%M:%S UTC")
                )
            }
            Self::TokenInvalid { reason } => {
                write!(f, "JWT token signature is invalid: {reason}")
            }
            Self::TokenMalformed { details } => {
                write!(f, "JWT token is malformed: {details}")
            }
        }
    }
}

impl std::error::Error for JwtValidationError {}

impl From<JwtValidationError> for AppError {
    fn from(error: JwtValidationError) -> Self {
        match error {
            JwtValidationError::TokenExpired { .. } => Self::auth_expired(),
            JwtValidationError::TokenInvalid { reason } => Self::auth_invalid(reason),
            JwtValidationError::TokenMalformed { details } => Self::auth_invalid(details),
        }
    }
}

/// `JWT` claims for user authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User `ID`
    pub sub: String,
    /// User email
    pub email: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Audience (who the token is intended for)
    pub aud: String,
}

/// Authentication manager for `JWT` tokens and user sessions
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_hours: i64,
    /// Monotonic counter to ensure unique timestamps for tokens
    token_counter: AtomicU64,
    secret: Vec<u8>,
}

impl Clone for AuthManager {
    fn clone(&self) -> Self {
        Self {
            encoding_key: self.encoding_key.clone(),
            decoding_key: self.decoding_key.clone(),
            token_expiry_hours: self.token_expiry_hours,
            // Fresh counter for the clone; each instance maintains
            // uniqueness independently
            token_counter: AtomicU64::new(0),
            secret: self.secret.clone(),
        }
    }
}

impl AuthManager {
    /// Create a new authentication manager with an HS256 secret
    #[must_use]
    pub fn new(secret: Vec<u8>, token_expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(&secret),
            decoding_key: DecodingKey::from_secret(&secret),
            token_expiry_hours,
            token_counter: AtomicU64::new(0),
            secret,
        }
    }

    /// Configured token lifetime in hours
    #[must_use]
    pub const fn token_expiry_hours(&self) -> i64 {
        self.token_expiry_hours
    }

    /// Generate a `JWT` token for a user
    ///
    /// # Errors
    ///
    /// Returns an error if JWT encoding fails due to invalid claims
    pub fn generate_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let expiry = now + Duration::hours(self.token_expiry_hours);

        // Use atomic counter to ensure unique issued-at times
        let counter = self.token_counter.fetch_add(1, Ordering::Relaxed);
        let unique_iat =
            now.timestamp() * 1000 + i64::from(u32::try_from(counter % 1000).unwrap_or(0));

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: unique_iat,
            exp: expiry.timestamp(),
            aud: service_names::DAYBOOK_SERVER.to_owned(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(token)
    }

    /// Validate a `JWT` token and return its claims
    ///
    /// # Errors
    ///
    /// Returns an error if the token is expired, malformed, or carries an
    /// invalid signature
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        self.validate_token_detailed(token)
            .map_err(|e| anyhow::anyhow!("{e}"))
    }

    /// Validate a `JWT` token with detailed error information
    ///
    /// # Errors
    ///
    /// Returns a [`JwtValidationError`] distinguishing expired, malformed,
    /// and wrongly-signed tokens
    pub fn validate_token_detailed(&self, token: &str) -> Result<Claims, JwtValidationError> {
        let claims = self.decode_token_claims(token)?;
        Self::validate_claims_expiry(&claims)?;
        Ok(claims)
    }

    /// Decode token claims without expiration validation
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed or wrongly signed
    pub fn decode_token_claims(&self, token: &str) -> Result<Claims, JwtValidationError> {
        let mut validation_no_exp = Validation::new(Algorithm::HS256);
        validation_no_exp.validate_exp = false;
        validation_no_exp.set_audience(&[service_names::DAYBOOK_SERVER]);

        decode::<Claims>(token, &self.decoding_key, &validation_no_exp)
            .map(|token_data| token_data.claims)
            .map_err(|e| Self::convert_jwt_error(&e))
    }

    /// Validate claims expiration with detailed logging
    fn validate_claims_expiry(claims: &Claims) -> Result<(), JwtValidationError> {
        let current_time = Utc::now();
        let expired_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);

        if current_time.timestamp() > claims.exp {
            let time_since_expiry = current_time.signed_duration_since(expired_at);
            tracing::warn!(
                "JWT token expired for user: {} - Expired {} ago at {}",
                claims.sub,
                humanize_duration(time_since_expiry),
                expired_at.to_rfc3339()
            );
            return Err(JwtValidationError::TokenExpired {
                expired_at,
                current_time,
            });
        }
        Ok(())
    }

    /// Convert JWT library errors to detailed validation errors
    fn convert_jwt_error(e: &jsonwebtoken::errors::Error) -> JwtValidationError {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::InvalidSignature => JwtValidationError::TokenInvalid {
                reason: "Token signature verification failed".into(),
            },
            ErrorKind::InvalidToken => JwtValidationError::TokenMalformed {
                details: "Token format is invalid".into(),
            },
            ErrorKind::Base64(base64_err) => JwtValidationError::TokenMalformed {
                details: format!("Token contains invalid base64: {base64_err}"),
            },
            ErrorKind::Json(json_err) => JwtValidationError::TokenMalformed {
                details: format!("Token contains invalid JSON: {json_err}"),
            },
            ErrorKind::Utf8(utf8_err) => JwtValidationError::TokenMalformed {
                details: format!("Token contains invalid UTF-8: {utf8_err}"),
            },
            _ => JwtValidationError::TokenInvalid {
                reason: format!("Token validation failed: {e}"),
            },
        }
    }

    /// Refresh a token: the old signature must verify even when expired
    ///
    /// # Errors
    ///
    /// Returns an error if the old token's signature is invalid, the token
    /// is malformed, or the claims do not belong to `user`
    pub fn refresh_token(&self, old_token: &str, user: &User) -> Result<String> {
        let claims = self
            .decode_token_claims(old_token)
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        if claims.sub != user.id.to_string() {
            return Err(anyhow::anyhow!("Token does not belong to this user"));
        }

        self.generate_token(user)
    }
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("token_expiry_hours", &self.token_expiry_hours)
            .finish_non_exhaustive()
    }
}

/// Generate a random HS256 secret, hex-encoded
///
/// Used when `JWT_SECRET` is unset outside production. Sessions signed
/// with a generated secret do not survive a restart.
#[must_use]
pub fn generate_jwt_secret() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Extract and validate the bearer token from request headers
///
/// Every protected handler calls this first. Handlers scope storage by
/// the returned principal's `user_id`, never by ids in request bodies.
///
/// # Errors
///
/// Returns `AUTH_REQUIRED` when no `Authorization` header is present and
/// `AUTH_INVALID`/`AUTH_EXPIRED` when the token fails validation.
pub fn authenticate(
    headers: &axum::http::HeaderMap,
    auth_manager: &AuthManager,
) -> Result<SessionPrincipal, AppError> {
    let auth_header = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(AppError::auth_required)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::auth_invalid("Authorization header is not a bearer token"))?;

    let claims = auth_manager.validate_token_detailed(token)?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|e| AppError::auth_invalid(format!("Token subject is not a user id: {e}")))?;

    Ok(SessionPrincipal::new(user_id, claims.email))
}

/// Hash a password with bcrypt on a blocking thread
///
/// # Errors
///
/// Returns an error if the hashing task fails to run or bcrypt rejects
/// the input
pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
        .map_err(|e| AppError::internal(format!("Password hashing error: {e}")))
}

/// Verify a password against a bcrypt hash on a blocking thread
///
/// # Errors
///
/// Returns an error if the verification task fails to run or the stored
/// hash is unparseable
pub async fn verify_password(password: String, password_hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(&password, &password_hash))
        .await
        .map_err(|e| AppError::internal(format!("Password verification task failed: {e}")))?
        .map_err(|e| AppError::internal(format!("Password verification error: {e}")))
}

/// Generate a random one-time token (verification and reset flows)
#[must_use]
pub fn generate_one_time_token(num_bytes: usize) -> String {
    use rand::RngCore;
    let mut bytes = vec![0u8; num_bytes];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User::new("tester@example.com".into(), "hash".into(), None)
    }

    fn test_manager() -> AuthManager {
        AuthManager::new(b"test-secret-test-secret-test-secr".to_vec(), 24)
    }

    #[test]
    fn test_generate_and_validate_token() {
        let manager = test_manager();
        let user = test_user();

        let token = manager.generate_token(&user).unwrap();
        let claims = manager.validate_token_detailed(&token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, user.email);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_tokens_get_unique_issued_at() {
        let manager = test_manager();
        let user = test_user();

        let a = manager.generate_token(&user).unwrap();
        let b = manager.generate_token(&user).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let manager = test_manager();
        let other = AuthManager::new(b"another-secret-another-secret-an".to_vec(), 24);
        let token = manager.generate_token(&test_user()).unwrap();

        let err = other.validate_token_detailed(&token).unwrap_err();
        assert!(matches!(err, JwtValidationError::TokenInvalid { .. }));
    }

    #[test]
    fn test_expired_token_is_reported_as_expired() {
        let manager = AuthManager::new(b"test-secret-test-secret-test-secr".to_vec(), -1);
        let token = manager.generate_token(&test_user()).unwrap();

        let err = manager.validate_token_detailed(&token).unwrap_err();
        assert!(matches!(err, JwtValidationError::TokenExpired { .. }));
    }

    #[test]
    fn test_refresh_accepts_expired_token_with_valid_signature() {
        let expired = AuthManager::new(b"test-secret-test-secret-test-secr".to_vec(), -1);
        let user = test_user();
        let old = expired.generate_token(&user).unwrap();

        let fresh = test_manager();
        let new_token = fresh.refresh_token(&old, &user).unwrap();
        assert!(fresh.validate_token_detailed(&new_token).is_ok());
    }

    #[test]
    fn test_refresh_rejects_other_users_token() {
        let manager = test_manager();
        let user = test_user();
        let other = User::new("other@example.com".into(), "hash".into(), None);
        let token = manager.generate_token(&user).unwrap();

        assert!(manager.refresh_token(&token, &other).is_err());
    }

    #[test]
    fn test_authenticate_extracts_principal() {
        let manager = test_manager();
        let user = test_user();
        let token = manager.generate_token(&user).unwrap();

        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {token}").parse().unwrap(),
        );

        let principal = authenticate(&headers, &manager).unwrap();
        assert_eq!(principal.user_id, user.id);
        assert_eq!(principal.email, user.email);
    }

    #[test]
    fn test_authenticate_requires_header() {
        let manager = test_manager();
        let headers = axum::http::HeaderMap::new();
        assert!(authenticate(&headers, &manager).is_err());
    }

    #[test]
    fn test_one_time_token_is_hex_of_requested_length() {
        let token = generate_one_time_token(32);
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse".into()).await.unwrap();
        assert!(verify_password("correct horse".into(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password("wrong horse".into(), hash).await.unwrap());
    }
}
