// ABOUTME: Token and user verification route
// ABOUTME: Checks the shared secret, then username and telephone against the user table
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! # Verification Route
//!
//! `POST /verify` validates a presented secret and, when username and
//! telephone are supplied, looks the caller up in the user table. An unknown
//! user is recorded as a pending row so an administrator can activate them
//! later. The response is always `200`; outcome lives in the envelope.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::resources::ServerResources;
use crate::routes::ServiceResponse;

const SECRET_EMPTY: &str = "Secret key is empty";
const SECRET_INVALID: &str = "密钥无效 | Secret key is invalid";
const USER_UNKNOWN: &str = "用户不存在，请联系管理员";
const VERIFY_OK: &str = "Verify successfully";

/// Verification request body
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Presented shared secret
    #[serde(default)]
    pub token: String,
    /// Username to verify
    #[serde(default)]
    pub username: String,
    /// Telephone number to verify
    #[serde(default)]
    pub telephone: String,
}

/// Verification route registration and handler
pub struct VerifyRoutes;

impl VerifyRoutes {
    /// Build the verification sub-router
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/verify", post(Self::verify))
            .with_state(resources)
    }

    /// Handle `POST /verify`
    pub async fn verify(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<VerifyRequest>,
    ) -> Json<ServiceResponse<serde_json::Value>> {
        if request.token.is_empty() {
            return Json(ServiceResponse::fail(SECRET_EMPTY));
        }

        let expected = resources.config.auth.secret_key.as_bytes();
        if !bool::from(request.token.as_bytes().ct_eq(expected)) {
            warn!("Verification rejected an invalid secret");
            return Json(ServiceResponse::fail(SECRET_INVALID));
        }

        let Some(database) = &resources.database else {
            warn!("Verification requested but no database is configured");
            return Json(ServiceResponse::fail(USER_UNKNOWN));
        };

        let users = database.users();
        match users
            .find_active_user(&request.username, &request.telephone)
            .await
        {
            Ok(Some(_)) => {
                info!(username = %request.username, "User verified");
                Json(ServiceResponse::success_with_message(
                    serde_json::Value::Null,
                    VERIFY_OK,
                ))
            }
            Ok(None) => {
                // Record the attempt as a pending user for admin review.
                if let Err(e) = users
                    .insert_pending_user(&request.username, &request.telephone)
                    .await
                {
                    warn!("Failed to record pending user: {e}");
                }
                Json(ServiceResponse::fail(USER_UNKNOWN))
            }
            Err(e) => {
                warn!("User lookup failed: {e}");
                Json(ServiceResponse::fail(USER_UNKNOWN))
            }
        }
    }
}
