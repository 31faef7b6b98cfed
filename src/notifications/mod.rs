// ABOUTME: Completion notification sidecar posting finished exchanges to a subscriber
// ABOUTME: Best-effort, at-most-once delivery with log-only failure handling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! # Notification Sidecar
//!
//! After an exchange completes, the relay posts the (possibly partially
//! filled) [`ExchangeRecord`] to an external subscriber endpoint. Delivery is
//! best-effort and at-most-once: no retry, no queueing. A non-success status
//! or network failure is logged by the caller and never propagated to the
//! client.

use std::time::Duration;
use tracing::debug;

use crate::database::ExchangeRecord;
use crate::errors::{AppError, AppResult};

/// Notification request timeout; the relay must not be held up by a slow
/// subscriber for longer than this.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Completion notification client
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl Notifier {
    /// Create a notifier; `None` endpoint disables delivery entirely
    #[must_use]
    pub fn new(endpoint: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(NOTIFY_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, endpoint }
    }

    /// Whether a subscriber endpoint is configured
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// POST the exchange record to the subscriber endpoint
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or a non-success response status.
    /// Callers treat any error as non-fatal: log and continue.
    pub async fn notify(&self, record: &ExchangeRecord) -> AppResult<()> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            debug!("Notification endpoint not configured; skipping");
            return Ok(());
        };

        let response = self
            .client
            .post(endpoint)
            .json(record)
            .send()
            .await
            .map_err(|e| {
                AppError::external_service("notifier", format!("Failed to deliver: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::external_service(
                "notifier",
                format!("Subscriber responded with HTTP {status}"),
            ));
        }

        debug!(exchange_id = ?record.id, "Completion notification delivered");
        Ok(())
    }
}
