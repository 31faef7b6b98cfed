// ABOUTME: Static bearer-token authentication against the shared secret
// ABOUTME: Narrow stand-in for a real token service, disabled when no secret is set
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! Bearer-token authentication middleware
//!
//! The gateway does not issue tokens; clients present the shared secret as a
//! bearer token. When no real secret is configured the check is disabled,
//! matching the legacy deployment. Comparison is constant-time.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::errors::AppError;
use crate::resources::ServerResources;

/// Require a valid bearer token on the wrapped routes
///
/// # Errors
///
/// Returns an unauthorized error when a secret is configured and the
/// `Authorization` header is missing, malformed, or carries the wrong token.
pub async fn require_token(
    State(resources): State<Arc<ServerResources>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !resources.config.auth.secret_configured {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or_else(AppError::auth_required)?;

    let expected = resources.config.auth.secret_key.as_bytes();
    if token.as_bytes().ct_eq(expected).into() {
        Ok(next.run(request).await)
    } else {
        warn!("Rejected request with invalid bearer token");
        Err(AppError::auth_invalid("Invalid access token"))
    }
}
