// ABOUTME: Upstream completion service abstraction with streaming support
// ABOUTME: Defines chunk wire types and the provider contract the relay drives
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! # Upstream Completion Provider Interface
//!
//! The relay treats the conversational-completion service as a black-box
//! streaming capability behind [`CompletionProvider`]. Each produced
//! [`ChatChunk`] carries the running response text; the final chunk also
//! carries the conversation identifier and a finish reason. The last chunk
//! received for a request is the authoritative final state.

mod openai;

pub use openai::OpenAiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

use crate::errors::AppResult;

// ============================================================================
// Wire Types
// ============================================================================

/// Continuation context from a prior exchange, passed through opaquely
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatContext {
    /// Upstream conversation identifier from the previous turn
    pub conversation_id: Option<String>,
    /// Identifier of the message this turn continues from
    pub parent_message_id: Option<String>,
}

/// One incremental unit of the upstream response
///
/// Serialization skips absent fields so intermediate chunks stay minimal on
/// the wire: `{"text":"Hi"}` for a delta, with `id` and `detail` appearing
/// only once the upstream reports them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChunk {
    /// Running response text accumulated so far
    pub text: String,
    /// Upstream-assigned conversation identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Completion detail, present on the final chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<ChatDetail>,
}

/// Completion-detail structure reported by the upstream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatDetail {
    /// Completion choices; the relay only reads the first
    pub choices: Vec<ChatChoice>,
}

/// A single completion choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    /// Why the upstream stopped producing text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl ChatChunk {
    /// Finish reason from the first completion choice, if reported
    #[must_use]
    pub fn finish_reason(&self) -> Option<&str> {
        self.detail
            .as_ref()
            .and_then(|d| d.choices.first())
            .and_then(|c| c.finish_reason.as_deref())
    }
}

// ============================================================================
// Provider Contract
// ============================================================================

/// A single relay request to the upstream service
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Trimmed, non-empty user prompt
    pub prompt: String,
    /// Prior-turn continuation context
    pub context: ChatContext,
    /// Optional system message override
    pub system_message: Option<String>,
    /// Optional sampling temperature
    pub temperature: Option<f32>,
}

/// Stream of incrementally produced chunks
pub type ChunkStream = Pin<Box<dyn Stream<Item = AppResult<ChatChunk>> + Send>>;

/// Upstream completion service contract
///
/// The gateway never inspects how the service generates text; it only
/// forwards the chunks the stream yields, in order.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Model identifier reported by `/session`
    fn model(&self) -> &str;

    /// Opaque configuration descriptor returned by `/config`
    fn descriptor(&self) -> serde_json::Value;

    /// Start a streaming completion for one relay request
    async fn stream_chat(&self, request: CompletionRequest) -> AppResult<ChunkStream>;
}
