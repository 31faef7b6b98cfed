// ABOUTME: OpenAI-compatible streaming completion client for the relay
// ABOUTME: Parses SSE data lines into running-text ChatChunks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! OpenAI-compatible upstream provider
//!
//! Speaks the `chat/completions` streaming protocol. Delta content is
//! accumulated into the running text each chunk carries; the conversation
//! identifier and finish reason are attached when the upstream reports a
//! finished choice.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::{debug, error, warn};

use super::{
    ChatChoice, ChatChunk, ChatDetail, ChunkStream, CompletionProvider, CompletionRequest,
};
use crate::config::environment::UpstreamConfig;
use crate::errors::{AppError, AppResult};

/// Default system message sent when the request carries none
const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful assistant.";

/// OpenAI-compatible chat completion provider
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct WireStreamChunk {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    choices: Vec<WireStreamChoice>,
}

#[derive(Deserialize)]
struct WireStreamChoice {
    #[serde(default)]
    delta: WireDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct WireDelta {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    /// Build a provider from upstream configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the API key is empty or the HTTP
    /// client cannot be constructed.
    pub fn from_config(config: &UpstreamConfig) -> AppResult<Self> {
        if config.api_key.is_empty() {
            return Err(AppError::config("OPENAI_API_KEY is not set"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout_ms: config.timeout_ms,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    /// Parse one SSE `data:` payload into an optional chunk update
    fn apply_data_line(
        line: &str,
        text: &mut String,
        conversation_id: &mut Option<String>,
    ) -> Option<ChatChunk> {
        let json_str = line.strip_prefix("data: ")?;
        if json_str == "[DONE]" {
            return None;
        }

        let wire: WireStreamChunk = match serde_json::from_str(json_str) {
            Ok(wire) => wire,
            Err(e) => {
                warn!("Failed to parse upstream stream chunk: {}", e);
                return None;
            }
        };

        if conversation_id.is_none() {
            conversation_id.clone_from(&wire.id);
        }

        let choice = wire.choices.into_iter().next()?;
        if let Some(delta) = choice.delta.content {
            text.push_str(&delta);
        }

        let finished = choice.finish_reason.is_some();
        Some(ChatChunk {
            text: text.clone(),
            id: if finished {
                conversation_id.clone()
            } else {
                None
            },
            detail: finished.then(|| ChatDetail {
                choices: vec![ChatChoice {
                    finish_reason: choice.finish_reason,
                }],
            }),
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn model(&self) -> &str {
        &self.model
    }

    fn descriptor(&self) -> serde_json::Value {
        json!({
            "apiModel": self.model,
            "apiBaseUrl": self.api_base,
            "timeoutMs": self.timeout_ms,
        })
    }

    async fn stream_chat(&self, request: CompletionRequest) -> AppResult<ChunkStream> {
        debug!(
            model = %self.model,
            has_context = request.context.conversation_id.is_some(),
            "Sending streaming completion request upstream"
        );

        let system_message = request
            .system_message
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_MESSAGE);
        let messages = vec![
            WireMessage {
                role: "system",
                content: system_message,
            },
            WireMessage {
                role: "user",
                content: &request.prompt,
            },
        ];

        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
            "stream": true,
        });

        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send streaming request upstream: {}", e);
                AppError::external_service("upstream", format!("Failed to connect: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, "Upstream returned an error response");
            return Err(AppError::external_service(
                "upstream",
                format!("HTTP {status}: {body}"),
            ));
        }

        let mut byte_stream = response.bytes_stream();

        // SSE events can be split across network reads, so lines are
        // reassembled from a carry-over buffer before parsing.
        let stream = async_stream::stream! {
            let mut buffer = String::new();
            let mut text = String::new();
            let mut conversation_id: Option<String> = None;

            while let Some(read) = byte_stream.next().await {
                let bytes = match read {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        error!("Error reading upstream stream: {}", e);
                        yield Err(AppError::external_service(
                            "upstream",
                            format!("Stream read error: {e}"),
                        ));
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_owned();
                    buffer.drain(..=pos);
                    if line.is_empty() {
                        continue;
                    }
                    if let Some(chunk) =
                        Self::apply_data_line(&line, &mut text, &mut conversation_id)
                    {
                        yield Ok(chunk);
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
