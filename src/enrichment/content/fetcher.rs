//! Content fetcher contract
//!
//! A fetcher turns one URL into page content through an external scrape
//! provider. Every failure comes back as a [`FetchError`] value; nothing
//! panics or escapes past this boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page content returned by the scrape provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedContent {
    /// URL that was scraped
    pub url: String,
    /// Markdown rendering of the page
    pub markdown: String,
    /// HTML rendering, when the provider returned one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Provider metadata (title, description, status code, ...)
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Content fetch error types
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// No scrape credentials configured
    #[error("Scrape provider not configured")]
    NotConfigured,

    /// Request timed out
    #[error("Timeout fetching: {0}")]
    Timeout(String),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Provider answered with a non-success status
    #[error("HTTP {0} for: {1}")]
    HttpStatus(u16, String),

    /// Response body did not match the expected shape
    #[error("Malformed scrape response: {0}")]
    MalformedResponse(String),

    /// Provider reported `success: false`
    #[error("Scrape unsuccessful for {url}: {reason}")]
    Unsuccessful { url: String, reason: String },
}

/// Fetches page content for a URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch content for `url`. Single attempt, no retry.
    async fn fetch(&self, url: &str) -> Result<ScrapedContent, FetchError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Whether the fetcher has what it needs to make requests
    fn is_available(&self) -> bool;
}
