// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides config, resource, and scripted upstream provider helpers
#![allow(dead_code)]

//! Shared test utilities for `chat_gateway`
//!
//! This module provides common test setup functions to reduce duplication
//! across integration tests.

use async_trait::async_trait;
use axum::Router;
use chat_gateway::{
    config::environment::{
        AuthConfig, DatabaseConfig, NotificationConfig, RateLimitConfig, SecurityConfig,
        ServerConfig, UpstreamConfig,
    },
    database::Database,
    errors::{AppError, AppResult},
    notifications::Notifier,
    resources::ServerResources,
    routes::gateway_router,
    upstream::{ChatChoice, ChatChunk, ChatDetail, ChunkStream, CompletionProvider,
        CompletionRequest},
};
use std::sync::{Arc, Once};

static INIT_LOGGER: Once = Once::new();

/// Shared secret used by tests that exercise authenticated routes
pub const TEST_SECRET: &str = "test-secret-key";

/// Referer accepted by the default test allowlist
pub const ALLOWED_REFERER: &str = "http://localhost:3000/";

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Standard test configuration: secret configured, localhost allowed
pub fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        auth: AuthConfig {
            secret_key: TEST_SECRET.into(),
            secret_configured: true,
        },
        database: DatabaseConfig { url: None },
        upstream: UpstreamConfig {
            api_base: "http://127.0.0.1:9".into(),
            api_key: "test-key".into(),
            model: "test-model".into(),
            timeout_ms: 5_000,
        },
        notification: NotificationConfig { endpoint: None },
        security: SecurityConfig {
            allowed_origin_fragments: vec!["localhost".into(), "chatweb.example.com".into()],
            rate_limit: RateLimitConfig {
                enabled: true,
                max_requests_per_hour: 1000,
            },
        },
    }
}

/// Standard test database setup
pub async fn create_test_database() -> Database {
    init_test_logging();
    Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database")
}

/// Build server resources around a scripted provider
pub async fn create_test_resources(
    config: ServerConfig,
    provider: Arc<dyn CompletionProvider>,
    database: Option<Database>,
) -> Arc<ServerResources> {
    init_test_logging();
    let notifier = Notifier::new(config.notification.endpoint.clone());
    Arc::new(ServerResources::new(config, provider, database, notifier))
}

/// Full gateway router over the given resources
pub fn gateway_app(resources: Arc<ServerResources>) -> Router {
    gateway_router(resources)
}

/// Encrypt a relay request body the way a browser client would
pub fn encrypted_body(
    resources: &ServerResources,
    request: &serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({ "queryData": resources.cipher.encrypt(&request.to_string()) })
}

// ============================================================================
// Scripted Provider
// ============================================================================

/// A chunk-or-error step in a scripted upstream response
#[derive(Clone)]
pub enum ScriptedStep {
    Chunk(ChatChunk),
    Error(String),
}

/// Upstream provider that replays a fixed chunk script for every request
pub struct ScriptedProvider {
    model: String,
    start_error: Option<String>,
    steps: Vec<ScriptedStep>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<ScriptedStep>) -> Self {
        Self {
            model: "test-model".into(),
            start_error: None,
            steps,
        }
    }

    /// Provider whose `stream_chat` fails before yielding anything
    pub fn failing(message: &str) -> Self {
        Self {
            model: "test-model".into(),
            start_error: Some(message.to_owned()),
            steps: Vec::new(),
        }
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn model(&self) -> &str {
        &self.model
    }

    fn descriptor(&self) -> serde_json::Value {
        serde_json::json!({ "apiModel": self.model, "scripted": true })
    }

    async fn stream_chat(&self, _request: CompletionRequest) -> AppResult<ChunkStream> {
        if let Some(message) = &self.start_error {
            return Err(AppError::external_service("upstream", message.clone()));
        }
        let items: Vec<AppResult<ChatChunk>> = self
            .steps
            .iter()
            .cloned()
            .map(|step| match step {
                ScriptedStep::Chunk(chunk) => Ok(chunk),
                ScriptedStep::Error(message) => {
                    Err(AppError::external_service("upstream", message))
                }
            })
            .collect();
        Ok(Box::pin(tokio_stream::iter(items)))
    }
}

/// Intermediate chunk carrying only running text
pub fn delta_chunk(text: &str) -> ScriptedStep {
    ScriptedStep::Chunk(ChatChunk {
        text: text.to_owned(),
        id: None,
        detail: None,
    })
}

/// Final chunk carrying the conversation id and finish reason
pub fn final_chunk(text: &str, id: &str, finish_reason: &str) -> ScriptedStep {
    ScriptedStep::Chunk(ChatChunk {
        text: text.to_owned(),
        id: Some(id.to_owned()),
        detail: Some(ChatDetail {
            choices: vec![ChatChoice {
                finish_reason: Some(finish_reason.to_owned()),
            }],
        }),
    })
}

/// The canonical two-chunk upstream script used across relay tests
pub fn standard_script() -> Vec<ScriptedStep> {
    vec![delta_chunk("Hi"), final_chunk("Hi there", "c1", "stop")]
}
