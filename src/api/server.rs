// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::errors::ApiError;
use super::handlers::{ChatRequest, HealthResponse, ModelsResponse};
use super::streaming::{spawn_relay, RelayEvent};
use crate::completion::{CompletionProvider, CompletionRequest};
use crate::config::ModelCatalog;
use crate::enrichment::{ContentFetcher, MessageAugmenter};
use crate::rate_limit::{Admission, RateLimiter};

/// An accepted chat turn whose completion is streaming
#[derive(Debug)]
pub struct ChatStream {
    pub request_id: String,
    pub model: String,
    pub admission: Admission,
    /// Set when a detected site could not be scraped
    pub augmentation_error: Option<String>,
    pub events: mpsc::Receiver<RelayEvent>,
}

/// Chat turn pipeline: rate limit, then augmentation, then completion
pub struct ChatGateway {
    rate_limiter: RateLimiter,
    fetcher: Arc<dyn ContentFetcher>,
    augmenter: MessageAugmenter,
    provider: Arc<dyn CompletionProvider>,
    models: ModelCatalog,
    relay_buffer: usize,
}

impl ChatGateway {
    pub fn new(
        rate_limiter: RateLimiter,
        fetcher: Arc<dyn ContentFetcher>,
        provider: Arc<dyn CompletionProvider>,
        models: ModelCatalog,
        relay_buffer: usize,
    ) -> Self {
        Self {
            rate_limiter,
            augmenter: MessageAugmenter::new(fetcher.clone()),
            fetcher,
            provider,
            models,
            relay_buffer,
        }
    }

    /// Run one chat turn up to the point where deltas start flowing
    ///
    /// A denied request returns before any scrape or completion call.
    pub async fn handle_chat(
        &self,
        request: ChatRequest,
        request_id: &str,
    ) -> Result<ChatStream, ApiError> {
        request.validate()?;

        let model = self
            .models
            .resolve(request.requested_model())
            .ok_or_else(|| ApiError::ModelNotFound {
                model: request.model.clone(),
                available_models: self.models.ids(),
            })?
            .id
            .clone();

        let admission = self.rate_limiter.admit(&request.user_id).await?;
        if !admission.allowed {
            info!(
                "[{}] Rate limit exceeded for user {} ({}/{})",
                request_id, request.user_id, admission.count, admission.limit
            );
            return Err(ApiError::RateLimitExceeded {
                retry_after: retry_after_secs(admission.reset_after),
                limit: admission.limit,
            });
        }

        let last = request
            .messages
            .last()
            .ok_or_else(|| ApiError::InvalidRequest("messages must not be empty".to_string()))?;

        let augmentation = self.augmenter.augment(last).await;
        if let Some(domain) = &augmentation.domain {
            debug!(
                "[{}] Augmentation for {}: enriched={}",
                request_id,
                domain,
                augmentation.is_enriched()
            );
        }

        let completion_request = CompletionRequest::from_conversation(
            &model,
            &request.messages,
            augmentation.content,
        );

        info!(
            "[{}] Streaming completion: model={}, messages={}",
            request_id,
            model,
            completion_request.messages.len()
        );

        let stream = self
            .provider
            .stream_completion(completion_request)
            .await
            .map_err(|e| {
                error!(
                    "[{}] Completion provider '{}' failed before streaming: {}",
                    request_id,
                    self.provider.name(),
                    e
                );
                ApiError::from(e)
            })?;

        let events = spawn_relay(stream, self.relay_buffer, request_id.to_string());

        Ok(ChatStream {
            request_id: request_id.to_string(),
            model,
            admission,
            augmentation_error: augmentation.error,
            events,
        })
    }

    pub async fn health_check(&self) -> HealthResponse {
        let mut issues = Vec::new();

        if !self.rate_limiter.store_healthy().await {
            warn!("Counter store '{}' failed health check", self.rate_limiter.store_name());
            issues.push(format!(
                "Counter store '{}' unreachable",
                self.rate_limiter.store_name()
            ));
        }

        if !self.fetcher.is_available() {
            issues.push(format!(
                "Content fetcher '{}' not configured",
                self.fetcher.name()
            ));
        }

        if !self.provider.is_available() {
            issues.push(format!(
                "Completion provider '{}' not configured",
                self.provider.name()
            ));
        }

        let status = if issues.is_empty() { "ok" } else { "degraded" };

        HealthResponse {
            status: status.to_string(),
            issues: if issues.is_empty() {
                None
            } else {
                Some(issues)
            },
        }
    }

    pub fn models(&self) -> ModelsResponse {
        ModelsResponse {
            models: self.models.models.clone(),
            default_model: self.models.default_model.clone(),
        }
    }
}

/// Whole seconds until the window resets, at least 1
fn retry_after_secs(reset_after: Duration) -> u64 {
    let secs = reset_after.as_secs() + u64::from(reset_after.subsec_nanos() > 0);
    secs.max(1)
}
