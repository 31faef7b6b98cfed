// ABOUTME: Environment-based configuration loading for all gateway components
// ABOUTME: Defines ServerConfig and nested config structs populated from env vars
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! Environment-based configuration
//!
//! All configuration is read from environment variables at startup. A `.env`
//! file is loaded if present. See `ServerConfig::from_env` for the full list
//! of recognized variables.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};

/// Default shared secret matching the legacy deployment.
///
/// Known weakness carried over from the original service: running without
/// `AUTH_SECRET_KEY` falls back to this constant, which makes the payload
/// cipher and the token check trivially guessable. Set the variable in any
/// real deployment.
pub const DEFAULT_AUTH_SECRET: &str = "1234567890123456";

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP API port
    pub http_port: u16,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Upstream completion service configuration
    pub upstream: UpstreamConfig,
    /// Completion notification configuration
    pub notification: NotificationConfig,
    /// Security settings (origin allowlist, rate limiting)
    pub security: SecurityConfig,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret used for the bearer-token check and payload key derivation
    pub secret_key: String,
    /// Whether a real secret was configured (false means the default fallback)
    pub secret_configured: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `SQLite` connection string; `None` disables persistence entirely
    pub url: Option<String>,
}

/// Upstream completion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// API base URL (OpenAI-compatible)
    pub api_base: String,
    /// API key
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

/// Completion notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Subscriber endpoint to POST finished exchanges to; `None` disables it
    pub endpoint: Option<String>,
}

/// Security settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Host fragments accepted by the origin filter
    pub allowed_origin_fragments: Vec<String>,
    /// Rate limit configuration
    pub rate_limit: RateLimitConfig,
}

/// Rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether rate limiting is applied to the relay route
    pub enabled: bool,
    /// Maximum requests per client per hour
    pub max_requests_per_hour: u32,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Recognized variables:
    /// - `PORT` (default 3002)
    /// - `AUTH_SECRET_KEY` (default: legacy fallback, see [`DEFAULT_AUTH_SECRET`])
    /// - `DATABASE_URL` (unset disables persistence)
    /// - `OPENAI_API_BASE_URL`, `OPENAI_API_KEY`, `OPENAI_API_MODEL`, `TIMEOUT_MS`
    /// - `NOTIFY_ENDPOINT` (unset disables notifications)
    /// - `ORIGIN_ALLOWLIST` (comma-separated host fragments)
    /// - `RATE_LIMIT_ENABLED`, `MAX_REQUEST_PER_HOUR`
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable fails to parse.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let secret_key = env::var("AUTH_SECRET_KEY").ok();
        let secret_configured = secret_key.as_ref().is_some_and(|s| !s.trim().is_empty());
        if !secret_configured {
            warn!("AUTH_SECRET_KEY not set; falling back to the insecure default");
        }

        let config = Self {
            http_port: parse_var("PORT", 3002)?,
            auth: AuthConfig {
                secret_key: secret_key
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_AUTH_SECRET.into()),
                secret_configured,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            },
            upstream: UpstreamConfig {
                api_base: env_var_or("OPENAI_API_BASE_URL", "https://api.openai.com/v1"),
                api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                model: env_var_or("OPENAI_API_MODEL", "gpt-3.5-turbo"),
                timeout_ms: parse_var("TIMEOUT_MS", 100_000)?,
            },
            notification: NotificationConfig {
                endpoint: env::var("NOTIFY_ENDPOINT").ok().filter(|s| !s.is_empty()),
            },
            security: SecurityConfig {
                allowed_origin_fragments: parse_fragments(&env_var_or(
                    "ORIGIN_ALLOWLIST",
                    "chatweb.example.com,localhost,192.168.",
                )),
                rate_limit: RateLimitConfig {
                    enabled: env_var_or("RATE_LIMIT_ENABLED", "true") == "true",
                    max_requests_per_hour: parse_var("MAX_REQUEST_PER_HOUR", 1000)?,
                },
            },
        };

        info!("Configuration loaded from environment");
        Ok(config)
    }

    /// One-line startup summary with secrets omitted
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "port={} persistence={} notifications={} model={} rate_limit={}/h origins={:?}",
            self.http_port,
            if self.database.url.is_some() {
                "on"
            } else {
                "off"
            },
            if self.notification.endpoint.is_some() {
                "on"
            } else {
                "off"
            },
            self.upstream.model,
            self.security.rate_limit.max_requests_per_hour,
            self.security.allowed_origin_fragments,
        )
    }
}

/// Read an environment variable with a default
fn env_var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.into())
}

/// Read and parse an environment variable with a default
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow!("Invalid value for {name}: {raw}")),
        Err(_) => Ok(default),
    }
}

/// Split a comma-separated fragment list, dropping empty entries
fn parse_fragments(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
