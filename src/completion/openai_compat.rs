// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OpenAI-compatible streamed chat completions (Together, OpenAI, vLLM, ...)
//!
//! Sends `{model, messages, stream: true}` and decodes the SSE response
//! into [`CompletionChunk`]s. A body that closes without `[DONE]` or a
//! finish reason is reported as an error, never as a normal end.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

use super::config::CompletionConfig;
use super::provider::{CompletionProvider, DeltaStream};
use super::sse::SseDecoder;
use super::types::{CompletionChunk, CompletionError, CompletionRequest, Usage};

const DONE_MARKER: &str = "[DONE]";

/// Streamed completion client for OpenAI-compatible endpoints
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: CompletionConfig,
}

impl OpenAiCompatibleProvider {
    /// Create a new provider client
    ///
    /// Only the connect phase gets a client-level timeout; the response is
    /// bounded by the first-byte and idle timeouts instead so long streams
    /// are not cut off.
    pub fn new(config: CompletionConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the configuration
    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<DeltaStream, CompletionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(CompletionError::NotConfigured)?;
        let first_byte_timeout = self.config.first_byte_timeout;

        debug!(
            "Requesting streamed completion: model={}, messages={}",
            request.model,
            request.messages.len()
        );

        let send = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .header(ACCEPT, "text/event-stream")
            .json(&request)
            .send();

        let response = tokio::time::timeout(first_byte_timeout, send)
            .await
            .map_err(|_| CompletionError::Timeout {
                stage: "waiting for response headers",
                timeout_ms: first_byte_timeout.as_millis() as u64,
            })?
            .map_err(|e| CompletionError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = tokio::time::timeout(first_byte_timeout, response.text())
                .await
                .ok()
                .and_then(|r| r.ok())
                .unwrap_or_default();
            warn!("Completion provider rejected request with {}", status);
            return Err(CompletionError::Status {
                status: status.as_u16(),
                message: provider_error_message(&body),
            });
        }

        Ok(Box::pin(decode_completion_stream(
            response.bytes_stream(),
            self.config.idle_timeout,
        )))
    }

    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    fn is_available(&self) -> bool {
        self.config.api_key.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct StreamFrame {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    error: Option<ProviderErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProviderErrorBody {
    Object { message: String },
    Text(String),
}

impl ProviderErrorBody {
    fn into_message(self) -> String {
        match self {
            Self::Object { message } | Self::Text(message) => message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ProviderErrorBody,
}

/// Best-effort message from a provider error body
fn provider_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.into_message(),
        Err(_) => body.chars().take(500).collect(),
    }
}

struct DecodeState<S> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<CompletionChunk, CompletionError>>,
    finish_reason: Option<String>,
    usage: Option<Usage>,
    body_ended: bool,
    terminal_queued: bool,
    idle_timeout: Duration,
}

impl<S> DecodeState<S> {
    fn queue_terminal(&mut self, item: Result<CompletionChunk, CompletionError>) {
        if !self.terminal_queued {
            self.pending.push_back(item);
            self.terminal_queued = true;
        }
    }

    fn queue_finished(&mut self) {
        let finished = CompletionChunk::Finished {
            finish_reason: self.finish_reason.take(),
            usage: self.usage.take(),
        };
        self.queue_terminal(Ok(finished));
    }

    fn apply(&mut self, payload: &str) {
        if self.terminal_queued {
            return;
        }

        if payload.trim() == DONE_MARKER {
            self.queue_finished();
            return;
        }

        let frame: StreamFrame = match serde_json::from_str(payload) {
            Ok(frame) => frame,
            Err(e) => {
                self.queue_terminal(Err(CompletionError::Malformed(e.to_string())));
                return;
            }
        };

        if let Some(error) = frame.error {
            self.queue_terminal(Err(CompletionError::Provider(error.into_message())));
            return;
        }

        for choice in frame.choices {
            if let Some(text) = choice.delta.and_then(|d| d.content) {
                if !text.is_empty() {
                    self.pending.push_back(Ok(CompletionChunk::Delta(text)));
                }
            }
            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(reason);
            }
        }

        if let Some(usage) = frame.usage {
            self.usage = Some(usage);
        }
    }
}

/// Decode an SSE completion body into chunks
///
/// Yields deltas in arrival order, then exactly one terminal item: a
/// `Finished` chunk on `[DONE]` (or on EOF after a finish reason), or an
/// error on provider error frames, transport failures, idle timeout or a
/// truncated body.
pub fn decode_completion_stream<S, E>(
    body: S,
    idle_timeout: Duration,
) -> impl Stream<Item = Result<CompletionChunk, CompletionError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finish_reason: None,
        usage: None,
        body_ended: false,
        terminal_queued: false,
        idle_timeout,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.terminal_queued {
                return None;
            }
            if state.body_ended {
                if state.finish_reason.is_some() {
                    state.queue_finished();
                } else {
                    state.queue_terminal(Err(CompletionError::UnexpectedEof));
                }
                continue;
            }

            match tokio::time::timeout(state.idle_timeout, state.body.next()).await {
                Err(_) => {
                    let timeout_ms = state.idle_timeout.as_millis() as u64;
                    state.queue_terminal(Err(CompletionError::Timeout {
                        stage: "waiting for the next chunk",
                        timeout_ms,
                    }));
                }
                Ok(Some(Ok(bytes))) => {
                    for payload in state.decoder.push(&bytes) {
                        state.apply(&payload);
                    }
                }
                Ok(Some(Err(e))) => {
                    state.queue_terminal(Err(CompletionError::Http(e.to_string())));
                }
                Ok(None) => {
                    state.body_ended = true;
                    if let Some(payload) = state.decoder.finish() {
                        state.apply(&payload);
                    }
                }
            }
        }
    })
}
