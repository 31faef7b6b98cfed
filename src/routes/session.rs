// ABOUTME: Session and configuration routes for gateway clients
// ABOUTME: Reports auth requirements, active model, and the upstream descriptor
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! # Session and Configuration Routes
//!
//! `POST /session` is open and tells a client whether it must present a
//! token and which model answers. `POST /config` sits behind the bearer
//! check and returns the upstream provider's configuration descriptor.

use axum::extract::State;
use axum::middleware::from_fn_with_state;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::middleware::require_token;
use crate::resources::ServerResources;
use crate::routes::ServiceResponse;

/// `data` payload of the `/session` response
#[derive(Debug, Serialize)]
pub struct SessionData {
    /// Whether the gateway requires a bearer token
    pub auth: bool,
    /// Model identifier the upstream provider answers with
    pub model: String,
}

/// Session and configuration route registration and handlers
pub struct SessionRoutes;

impl SessionRoutes {
    /// Build the session sub-router; `/config` carries the token layer
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        let config = Router::new()
            .route("/config", post(Self::config))
            .route_layer(from_fn_with_state(resources.clone(), require_token));

        Router::new()
            .route("/session", post(Self::session))
            .merge(config)
            .with_state(resources)
    }

    /// Handle `POST /session`
    pub async fn session(
        State(resources): State<Arc<ServerResources>>,
    ) -> Json<ServiceResponse<SessionData>> {
        Json(ServiceResponse::success(SessionData {
            auth: resources.config.auth.secret_configured,
            model: resources.provider.model().to_owned(),
        }))
    }

    /// Handle `POST /config`
    pub async fn config(
        State(resources): State<Arc<ServerResources>>,
    ) -> Json<ServiceResponse<serde_json::Value>> {
        Json(ServiceResponse::success(resources.provider.descriptor()))
    }
}
