// ABOUTME: Origin allowlist filter rejecting requests from unknown hosts
// ABOUTME: Runs before any other processing and terminates the pipeline on reject
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! Origin allowlist filter
//!
//! Accepts a request only if its declared origin (`Referer`, falling back to
//! `Origin`) contains one of the configured host fragments. Rejection is a
//! hard 401 before any body processing; acceptance has no side effects. This
//! check is independent of the permissive CORS response headers layered on
//! top of it.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::header;
use std::sync::Arc;
use tracing::warn;

use crate::errors::AppError;
use crate::resources::ServerResources;

/// Reject requests whose declared origin is not on the allowlist
///
/// # Errors
///
/// Returns an unauthorized error when neither `Referer` nor `Origin`
/// contains an allowlisted host fragment. A missing header is a reject.
pub async fn origin_filter(
    State(resources): State<Arc<ServerResources>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let headers = request.headers();
    let declared = headers
        .get(header::REFERER)
        .or_else(|| headers.get(header::ORIGIN))
        .and_then(|value| value.to_str().ok());

    let fragments = &resources.config.security.allowed_origin_fragments;
    let allowed = declared.is_some_and(|origin| {
        fragments.iter().any(|fragment| origin.contains(fragment))
    });

    if !allowed {
        warn!(
            origin = declared.unwrap_or("<missing>"),
            "Request rejected by origin filter"
        );
        return Err(AppError::origin_denied());
    }

    Ok(next.run(request).await)
}
