// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, deployment modes, and runtime configuration parsing
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Environment-based configuration management for production deployment

use crate::constants::env_config;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Strongly typed log level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to `tracing::Level`
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
            Self::Trace => tracing::Level::TRACE,
        }
    }

    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info, // Default fallback
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Environment type for security and other configurations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development, // Default fallback for unrecognized values
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if this is a development environment
    #[must_use]
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Check if this is a testing environment
    #[must_use]
    pub const fn is_testing(&self) -> bool {
        matches!(self, Self::Testing)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Type-safe database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// SQLite database with file path
    SQLite {
        /// Path to the database file
        path: PathBuf,
    },
    /// In-memory SQLite (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string with validation
    #[must_use]
    pub fn parse_url(s: &str) -> Self {
        if let Some(path_str) = s.strip_prefix("sqlite:") {
            if path_str == ":memory:" {
                Self::Memory
            } else {
                Self::SQLite {
                    path: PathBuf::from(path_str),
                }
            }
        } else {
            // Fallback: treat as SQLite file path
            Self::SQLite {
                path: PathBuf::from(s),
            }
        }
    }

    /// Convert to connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".into(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::SQLite {
            path: PathBuf::from("./data/daybook.db"),
        }
    }
}

impl std::fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_connection_string())
    }
}

/// Top-level server configuration loaded from the process environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP API port
    pub http_port: u16,
    /// Log level
    pub log_level: LogLevel,
    /// Deployment environment
    pub environment: Environment,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// Chat pipeline configuration
    pub chat: ChatConfig,
    /// Security settings
    pub security: SecurityConfig,
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite path or `sqlite::memory:`)
    pub url: DatabaseUrl,
    /// Enable database migrations on startup
    pub auto_migrate: bool,
}

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// JWT signing secret; generated per-process when unset outside production
    pub jwt_secret: Option<String>,
    /// JWT expiry time in hours
    pub jwt_expiry_hours: i64,
}

/// Chat pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// System prompt prepended to every completion context
    pub system_prompt: String,
}

/// Security settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Allowed CORS origins ("*" or explicit list)
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable holds an unparseable
    /// value, or if validation fails for the resulting configuration.
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        // Load .env file if it exists
        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let config = Self {
            http_port: env_config::http_port(),
            log_level: LogLevel::from_str_or_default(&env_config::log_level()),
            environment: Environment::from_str_or_default(&env_var_or(
                "ENVIRONMENT",
                "development",
            )?),

            database: DatabaseConfig {
                url: DatabaseUrl::parse_url(&env_config::database_url()),
                auto_migrate: env_var_or("AUTO_MIGRATE", "true")?
                    .parse()
                    .context("Invalid AUTO_MIGRATE value")?,
            },

            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
                jwt_expiry_hours: env_config::jwt_expiry_hours(),
            },

            chat: ChatConfig {
                system_prompt: env_config::system_prompt(),
            },

            security: SecurityConfig {
                cors_origins: parse_origins(&env_var_or("CORS_ORIGINS", "*")?),
            },
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error when a production deployment is missing settings
    /// that must never fall back to generated defaults.
    pub fn validate(&self) -> Result<()> {
        if self.environment.is_production() && self.auth.jwt_secret.is_none() {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be set in production; generated secrets would \
                 invalidate sessions on every restart"
            ));
        }

        if self.auth.jwt_expiry_hours <= 0 {
            return Err(anyhow::anyhow!("JWT_EXPIRY_HOURS must be positive"));
        }

        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Daybook Server Configuration:\n\
             - HTTP Port: {}\n\
             - Log Level: {}\n\
             - Environment: {}\n\
             - Database: {}\n\
             - Auto Migrate: {}\n\
             - JWT Secret: {}\n\
             - CORS Origins: {}",
            self.http_port,
            self.log_level,
            self.environment,
            if self.database.url.is_memory() {
                "SQLite (memory)"
            } else {
                "SQLite"
            },
            self.database.auto_migrate,
            if self.auth.jwt_secret.is_some() {
                "Configured"
            } else {
                "Generated"
            },
            self.security.cors_origins.join(","),
        )
    }

    /// Check if this server runs in production
    #[must_use]
    pub const fn is_production(&self) -> bool {
        self.environment.is_production()
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> Result<String> {
    Ok(env::var(key).unwrap_or_else(|_| default.to_owned()))
}

/// Parse comma-separated CORS origins
fn parse_origins(origins_str: &str) -> Vec<String> {
    if origins_str == "*" {
        vec!["*".into()]
    } else {
        origins_str
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
