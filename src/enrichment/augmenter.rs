// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Message augmentation with scraped web content
//!
//! Rewrites the newest user message so the model sees the referenced page
//! before the question. A failed scrape leaves the message untouched and
//! records an error for the client instead.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::content::ContentFetcher;
use super::domain::detect_domain;
use crate::completion::ChatMessage;

/// Result of augmenting one message
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentationResult {
    /// Content to send to the completion provider
    pub content: String,
    /// Domain that was detected, if any
    pub domain: Option<String>,
    /// Human-readable error when the domain could not be fetched
    pub error: Option<String>,
}

impl AugmentationResult {
    fn unchanged(content: &str) -> Self {
        Self {
            content: content.to_string(),
            domain: None,
            error: None,
        }
    }

    /// Whether the content was rewritten
    pub fn is_enriched(&self) -> bool {
        self.domain.is_some() && self.error.is_none()
    }
}

/// Prompt template: page content first, then the original question
pub fn enriched_prompt(domain: &str, markdown: &str, question: &str) -> String {
    format!(
        "Website content for {}:\n{}\n\nQuestion: {}",
        domain, markdown, question
    )
}

/// Notice sent to the client when the page could not be fetched
pub fn augmentation_error(domain: &str) -> String {
    format!(
        "The site {} could not be accessed. The response is based on general knowledge.",
        domain
    )
}

/// Detects a domain in a message and prepends its scraped content
pub struct MessageAugmenter {
    fetcher: Arc<dyn ContentFetcher>,
}

impl MessageAugmenter {
    pub fn new(fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self { fetcher }
    }

    /// Augment a chat message
    ///
    /// Never fails: scrape errors are folded into [`AugmentationResult::error`]
    /// and the original content is kept.
    pub async fn augment(&self, message: &ChatMessage) -> AugmentationResult {
        let Some(domain) = detect_domain(&message.content) else {
            return AugmentationResult::unchanged(&message.content);
        };

        let url = format!("https://{}", domain);
        debug!("Detected domain {}, fetching {}", domain, url);

        match self.fetcher.fetch(&url).await {
            Ok(page) => {
                info!(
                    "Augmented message with {} chars from {}",
                    page.markdown.len(),
                    domain
                );
                AugmentationResult {
                    content: enriched_prompt(domain, &page.markdown, &message.content),
                    domain: Some(domain.to_string()),
                    error: None,
                }
            }
            Err(e) => {
                warn!(
                    "Content fetch via {} failed for {}: {}",
                    self.fetcher.name(),
                    domain,
                    e
                );
                AugmentationResult {
                    content: message.content.clone(),
                    domain: Some(domain.to_string()),
                    error: Some(augmentation_error(domain)),
                }
            }
        }
    }
}
