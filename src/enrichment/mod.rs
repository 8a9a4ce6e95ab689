// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Web content enrichment for chat messages
//!
//! When the newest user message mentions a website, the page is scraped
//! and its markdown is placed in front of the question before the
//! conversation reaches the model.
//!
//! Key features:
//! - First-match domain detection
//! - Single-attempt, time-bounded scrape
//! - Graceful degradation: a failed scrape never blocks the chat turn

pub mod augmenter;
pub mod content;
pub mod domain;

pub use augmenter::{augmentation_error, enriched_prompt, AugmentationResult, MessageAugmenter};
pub use content::{ContentFetcher, FetchError, FirecrawlFetcher, ScrapeConfig, ScrapedContent};
pub use domain::detect_domain;
