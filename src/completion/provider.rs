// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Completion provider trait definition

use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

use super::types::{CompletionChunk, CompletionError, CompletionRequest};

/// Stream of completion chunks, ending after a `Finished` chunk or an error
pub type DeltaStream =
    Pin<Box<dyn Stream<Item = Result<CompletionChunk, CompletionError>> + Send>>;

/// Trait for implementing streamed chat completion providers
///
/// Dropping the returned stream must release the underlying connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Start a streamed completion
    ///
    /// Returns once the provider has accepted the request; deltas are then
    /// pulled from the stream as they arrive.
    async fn stream_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<DeltaStream, CompletionError>;

    /// Get the provider name for logging
    fn name(&self) -> &'static str;

    /// Check if the provider is available (has API key, etc.)
    fn is_available(&self) -> bool;
}
