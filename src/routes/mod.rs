// ABOUTME: HTTP route assembly for the chat gateway
// ABOUTME: Mounts every route bare and under /api behind the origin filter
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! # HTTP Routes
//!
//! One router, four endpoints, mounted twice: once at the root and once
//! under `/api` for clients that front the gateway with a path-prefixed
//! proxy. The origin allowlist filter wraps everything; permissive CORS
//! response headers are layered outside of it.

pub mod chat;
pub mod session;
pub mod verify;

pub use chat::{ChatRoutes, EMPTY_PROMPT_NOTICE};
pub use session::SessionRoutes;
pub use verify::VerifyRoutes;

use axum::middleware::from_fn_with_state;
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::middleware::{origin_filter, setup_cors};
use crate::resources::ServerResources;

/// Service response envelope shared by the non-streaming routes
///
/// Outcome is reported in `status` ("Success" or "Fail"); the HTTP status
/// stays `200` either way.
#[derive(Debug, Serialize)]
pub struct ServiceResponse<T: Serialize> {
    /// "Success" or "Fail"
    pub status: &'static str,
    /// Human-readable outcome message
    pub message: String,
    /// Route-specific payload
    pub data: Option<T>,
}

impl<T: Serialize> ServiceResponse<T> {
    /// Successful response carrying `data`
    pub fn success(data: T) -> Self {
        Self {
            status: "Success",
            message: String::new(),
            data: Some(data),
        }
    }

    /// Successful response carrying `data` and a message
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            status: "Success",
            message: message.into(),
            data: Some(data),
        }
    }

    /// Failed response carrying only a message
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: "Fail",
            message: message.into(),
            data: None,
        }
    }
}

/// Assemble the full gateway router
#[must_use]
pub fn gateway_router(resources: Arc<ServerResources>) -> Router {
    let endpoints = Router::new()
        .merge(ChatRoutes::routes(resources.clone()))
        .merge(SessionRoutes::routes(resources.clone()))
        .merge(VerifyRoutes::routes(resources.clone()));

    Router::new()
        .merge(endpoints.clone())
        .nest("/api", endpoints)
        .layer(from_fn_with_state(resources, origin_filter))
        .layer(setup_cors())
        .layer(TraceLayer::new_for_http())
}
