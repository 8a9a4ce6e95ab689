// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Streamed chat completion against an OpenAI-compatible provider
//!
//! ## Architecture
//!
//! ```text
//! ChatMessage[] → CompletionRequest → CompletionProvider → SSE body
//!                                                            ↓
//!                                      SseDecoder → CompletionChunk stream
//! ```

pub mod config;
pub mod openai_compat;
pub mod provider;
pub mod sse;
pub mod types;

pub use config::{CompletionConfig, DEFAULT_COMPLETION_URL};
pub use openai_compat::{decode_completion_stream, OpenAiCompatibleProvider};
pub use provider::{CompletionProvider, DeltaStream};
pub use sse::SseDecoder;
pub use types::{
    ChatMessage, CompletionChunk, CompletionError, CompletionRequest, ProviderMessage, Role, Usage,
};

#[cfg(test)]
pub use provider::MockCompletionProvider;
