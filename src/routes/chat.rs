// ABOUTME: Relay route streaming upstream completion chunks to the client
// ABOUTME: Decrypts the request, streams newline-delimited JSON, then finalizes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! # Relay Route
//!
//! `POST /chat-process` is the gateway's reason to exist. The handler
//! decrypts the request envelope, then hands the rest of the work to a
//! spawned relay task that writes frames into a channel backing the response
//! body. The split guarantees the finalization step runs exactly once even
//! when the client disconnects mid-stream; frames sent after a disconnect
//! are silently dropped.
//!
//! The response is always `200` with `application/octet-stream`. Frames are
//! JSON objects delimited by a `\n` prefix on every frame after the first,
//! so a client can split on newlines without ever seeing a partial object.

use axum::body::Body;
use axum::extract::State;
use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use http::header;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, info};

use crate::database::ExchangeRecord;
use crate::errors::AppError;
use crate::middleware::{rate_limit, require_token};
use crate::resources::ServerResources;
use crate::upstream::{ChatChunk, ChatContext, CompletionRequest};

/// Fixed notice returned when the trimmed prompt is empty
pub const EMPTY_PROMPT_NOTICE: &str = "请输入您的会话内容";

/// Encrypted request envelope; the only field the route reads off the wire
#[derive(Debug, Deserialize)]
pub struct EncryptedBody {
    /// Base64 ciphertext of the serialized [`ChatProcessRequest`]
    #[serde(rename = "queryData")]
    pub query_data: String,
}

/// Decrypted relay request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatProcessRequest {
    /// User prompt, trimmed before any other processing
    pub prompt: String,
    /// Prior-turn continuation context
    #[serde(default)]
    pub options: ChatContext,
    /// Optional system message override
    #[serde(default)]
    pub system_message: Option<String>,
    /// Optional sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Client device descriptor, recorded with the exchange
    #[serde(default)]
    pub device: String,
    /// Client username, recorded with the exchange
    #[serde(default)]
    pub username: String,
}

/// Relay route registration and handlers
pub struct ChatRoutes;

impl ChatRoutes {
    /// Build the relay sub-router with its token and rate-limit layers
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/chat-process", post(Self::chat_process))
            .route_layer(from_fn_with_state(resources.clone(), rate_limit))
            .route_layer(from_fn_with_state(resources.clone(), require_token))
            .with_state(resources)
    }

    /// Handle `POST /chat-process`
    ///
    /// # Errors
    ///
    /// Returns a 400 error when the envelope cannot be decrypted or parsed.
    /// Once streaming starts the status is committed at 200 and all later
    /// failures surface as in-band error frames.
    pub async fn chat_process(
        State(resources): State<Arc<ServerResources>>,
        Json(body): Json<EncryptedBody>,
    ) -> Result<Response, AppError> {
        let request: ChatProcessRequest = resources.cipher.decrypt_request(&body.query_data)?;

        let (tx, rx) = mpsc::channel::<Bytes>(16);
        tokio::spawn(Self::relay(resources, request, tx));

        let stream = ReceiverStream::new(rx).map(Ok::<_, std::convert::Infallible>);
        Response::builder()
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from_stream(stream))
            .map_err(|e| AppError::internal(format!("Failed to build response: {e}")))
    }

    /// Drive one relay: stream chunks to the client, then finalize
    async fn relay(
        resources: Arc<ServerResources>,
        request: ChatProcessRequest,
        tx: mpsc::Sender<Bytes>,
    ) {
        let prompt = request.prompt.trim().to_owned();
        let mut record = ExchangeRecord::new(&prompt, &request.device, &request.username);
        let mut writer = FrameWriter::new(tx);
        let mut last_chunk: Option<ChatChunk> = None;

        if prompt.is_empty() {
            info!("Relay request carried an empty prompt");
            writer.send_raw(EMPTY_PROMPT_NOTICE).await;
        } else {
            Self::pre_insert(&resources, &mut record).await;
            last_chunk = Self::stream_upstream(&resources, &prompt, &request, &mut writer).await;
        }

        Self::finalize(&resources, &mut record, last_chunk, !prompt.is_empty()).await;
    }

    /// Best-effort insert of the exchange record before contacting upstream
    async fn pre_insert(resources: &ServerResources, record: &mut ExchangeRecord) {
        let Some(database) = &resources.database else {
            return;
        };
        match database.exchanges().insert_exchange(record).await {
            Ok(id) => {
                record.id = Some(id);
                debug!(exchange_id = id, "Pre-inserted exchange record");
            }
            Err(e) => error!("Failed to pre-insert exchange record: {e}"),
        }
    }

    /// Forward upstream chunks to the client, returning the last one seen
    async fn stream_upstream(
        resources: &ServerResources,
        prompt: &str,
        request: &ChatProcessRequest,
        writer: &mut FrameWriter,
    ) -> Option<ChatChunk> {
        let completion = CompletionRequest {
            prompt: prompt.to_owned(),
            context: request.options.clone(),
            system_message: request.system_message.clone(),
            temperature: request.temperature,
        };

        let mut stream = match resources.provider.stream_chat(completion).await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Upstream request failed before streaming: {e}");
                writer.send_error(&e).await;
                return None;
            }
        };

        let mut last_chunk = None;
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    writer.send_chunk(&chunk).await;
                    last_chunk = Some(chunk);
                }
                Err(e) => {
                    error!("Upstream stream failed mid-relay: {e}");
                    writer.send_error(&e).await;
                    break;
                }
            }
        }
        last_chunk
    }

    /// Complete the exchange record and fire the notification sidecar
    ///
    /// Runs exactly once per relay, whatever happened upstream. Each sidecar
    /// failure is logged and isolated from the other.
    async fn finalize(
        resources: &ServerResources,
        record: &mut ExchangeRecord,
        last_chunk: Option<ChatChunk>,
        streamed: bool,
    ) {
        if record.id.is_some() {
            if let Some(chunk) = last_chunk {
                record.finish_reason = chunk.finish_reason().map(ToOwned::to_owned);
                record.conversation_id = chunk.id;
                record.conversation = Some(chunk.text);

                if let Some(database) = &resources.database {
                    if let Err(e) = database.exchanges().update_exchange(record).await {
                        error!("Failed to update exchange record: {e}");
                    }
                }
            }
        }

        if streamed {
            if let Err(e) = resources.notifier.notify(record).await {
                error!("Completion notification failed: {e}");
            }
        }
    }
}

/// Writes newline-delimited JSON frames into the response channel
///
/// The first frame goes out bare; every later frame is prefixed with `\n`.
/// Send failures mean the client went away and are deliberately ignored so
/// the relay can proceed to finalization.
struct FrameWriter {
    tx: mpsc::Sender<Bytes>,
    first: bool,
}

impl FrameWriter {
    const fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx, first: true }
    }

    async fn send_chunk(&mut self, chunk: &ChatChunk) {
        match serde_json::to_string(chunk) {
            Ok(payload) => self.send_raw(&payload).await,
            Err(e) => error!("Failed to serialize chunk: {e}"),
        }
    }

    /// Emit an in-band error frame, shaped unlike any data chunk
    async fn send_error(&mut self, error: &AppError) {
        let frame = serde_json::json!({
            "error": {
                "code": error.code,
                "message": error.message,
            }
        });
        self.send_raw(&frame.to_string()).await;
    }

    async fn send_raw(&mut self, payload: &str) {
        let framed = if self.first {
            Bytes::from(payload.to_owned())
        } else {
            Bytes::from(format!("\n{payload}"))
        };
        self.first = false;
        let _ = self.tx.send(framed).await;
    }
}
