// ABOUTME: Fixed-window per-client rate limiting for the relay route
// ABOUTME: Narrow stand-in for an external rate-limit service
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! Fixed-window rate limiting
//!
//! Counts requests per client per hour in a concurrent map. The client key
//! is the first `X-Forwarded-For` address when present (the gateway sits
//! behind a trusted proxy), otherwise a shared fallback bucket.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::warn;

use crate::config::environment::RateLimitConfig;
use crate::errors::{AppError, AppResult};
use crate::resources::ServerResources;

const WINDOW_SECS: i64 = 3600;

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: i64,
    count: u32,
}

/// Fixed-window request counter keyed by client address
///
/// Keys are client-supplied, so expired windows are pruned once per window
/// to keep the map bounded over the process lifetime.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
    last_prune: AtomicI64,
}

impl RateLimiter {
    /// Create a limiter from configuration
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
            last_prune: AtomicI64::new(0),
        }
    }

    /// Drop windows that expired before `now`, at most once per window
    fn prune_expired(&self, now: i64) {
        let last = self.last_prune.load(Ordering::Relaxed);
        if now - last < WINDOW_SECS {
            return;
        }
        if self
            .last_prune
            .compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        self.windows
            .retain(|_, window| now - window.started_at < WINDOW_SECS);
    }

    /// Record one request for `key`, rejecting when over the ceiling
    ///
    /// # Errors
    ///
    /// Returns a rate-limit error when the client exceeded the hourly
    /// ceiling inside the current window.
    pub fn check(&self, key: &str) -> AppResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let now = chrono::Utc::now().timestamp();
        self.prune_expired(now);
        let limit = self.config.max_requests_per_hour;

        let mut entry = self.windows.entry(key.to_owned()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now - entry.started_at >= WINDOW_SECS {
            entry.started_at = now;
            entry.count = 0;
        }

        if entry.count >= limit {
            return Err(AppError::rate_limit_exceeded(limit));
        }

        entry.count += 1;
        Ok(())
    }
}

/// Apply the fixed-window rate limit to the wrapped routes
///
/// # Errors
///
/// Returns a 429 error when the client exceeded the hourly ceiling.
pub async fn rate_limit(
    State(resources): State<Arc<ServerResources>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .map_or_else(|| "unknown".to_owned(), |ip| ip.trim().to_owned());

    if let Err(e) = resources.rate_limiter.check(&key) {
        warn!(client = %key, "Request rejected by rate limiter");
        return Err(e);
    }

    Ok(next.run(request).await)
}
