// ABOUTME: HTTP middleware for origin filtering, token auth, rate limiting, and CORS
// ABOUTME: Request gates applied ahead of the route handlers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! HTTP middleware for the gateway

/// Static bearer-token authentication
pub mod auth;

/// Permissive CORS response headers
pub mod cors;

/// Origin allowlist filter
pub mod origin;

/// Fixed-window rate limiting
pub mod rate_limit;

pub use auth::require_token;
pub use cors::setup_cors;
pub use origin::origin_filter;
pub use rate_limit::{rate_limit, RateLimiter};
