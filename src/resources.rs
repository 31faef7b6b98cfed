// ABOUTME: Shared server resources injected into every route handler
// ABOUTME: Holds configuration, cipher, upstream provider, and sidecar clients
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! Shared server resources
//!
//! One immutable bundle constructed at process start and passed to the
//! router as state. The persistence capability is explicitly nullable: when
//! no database is configured, every persistence call site becomes a no-op
//! rather than relying on a global mutable handle.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::crypto::PayloadCipher;
use crate::database::Database;
use crate::middleware::RateLimiter;
use crate::notifications::Notifier;
use crate::upstream::CompletionProvider;

/// Everything the route handlers need, wired once at startup
pub struct ServerResources {
    /// Environment-derived configuration
    pub config: ServerConfig,
    /// Relay-route payload cipher, keyed from the shared secret
    pub cipher: PayloadCipher,
    /// Upstream completion service
    pub provider: Arc<dyn CompletionProvider>,
    /// Optional persistence; `None` turns the persistence sidecar off
    pub database: Option<Database>,
    /// Completion notification sidecar
    pub notifier: Notifier,
    /// Relay-route rate limiter
    pub rate_limiter: RateLimiter,
}

impl ServerResources {
    /// Wire up resources from configuration and constructed collaborators
    #[must_use]
    pub fn new(
        config: ServerConfig,
        provider: Arc<dyn CompletionProvider>,
        database: Option<Database>,
        notifier: Notifier,
    ) -> Self {
        let cipher = PayloadCipher::new(&config.auth.secret_key);
        let rate_limiter = RateLimiter::new(config.security.rate_limit.clone());
        Self {
            config,
            cipher,
            provider,
            database,
            notifier,
            rate_limiter,
        }
    }
}
