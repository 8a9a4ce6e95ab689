// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for chat completion

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A message as sent by the chat client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message text
    pub content: String,
    /// True for user messages, false for assistant replies
    #[serde(default)]
    pub is_user: bool,
}

/// Provider-side message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in the provider request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: Role,
    pub content: String,
}

/// Streamed chat completion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ProviderMessage>,
    pub stream: bool,
}

impl CompletionRequest {
    /// Build a streamed request from a client conversation
    ///
    /// Roles map `is_user` to `user`, everything else to `assistant`.
    /// The last message's content is replaced with `latest_content`;
    /// length and ordering are preserved.
    pub fn from_conversation(
        model: &str,
        conversation: &[ChatMessage],
        latest_content: String,
    ) -> Self {
        let last_index = conversation.len().saturating_sub(1);
        let mut latest_content = Some(latest_content);

        let messages = conversation
            .iter()
            .enumerate()
            .map(|(index, message)| {
                let content = if index == last_index {
                    latest_content
                        .take()
                        .unwrap_or_else(|| message.content.clone())
                } else {
                    message.content.clone()
                };
                ProviderMessage {
                    role: if message.is_user {
                        Role::User
                    } else {
                        Role::Assistant
                    },
                    content,
                }
            })
            .collect();

        Self {
            model: model.to_string(),
            messages,
            stream: true,
        }
    }
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// One item of a completion stream
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionChunk {
    /// Incremental text
    Delta(String),
    /// Provider signalled completion
    Finished {
        finish_reason: Option<String>,
        usage: Option<Usage>,
    },
}

/// Errors from the completion provider
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompletionError {
    /// No API key configured
    #[error("Completion provider not configured")]
    NotConfigured,

    /// A stage of the call exceeded its time budget
    #[error("Completion provider timed out while {stage} after {timeout_ms}ms")]
    Timeout { stage: &'static str, timeout_ms: u64 },

    /// Transport failure
    #[error("Completion transport error: {0}")]
    Http(String),

    /// Non-success HTTP status before streaming started
    #[error("Completion provider returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Error frame inside the stream
    #[error("Completion provider error: {0}")]
    Provider(String),

    /// Unparseable stream frame
    #[error("Malformed completion frame: {0}")]
    Malformed(String),

    /// Body ended without a terminal marker
    #[error("Completion stream ended unexpectedly")]
    UnexpectedEof,
}
