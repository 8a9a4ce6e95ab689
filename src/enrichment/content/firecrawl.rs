//! Firecrawl scrape provider
//!
//! Issues one `POST /v1/scrape` per URL asking for markdown and HTML.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::ScrapeConfig;
use super::fetcher::{ContentFetcher, FetchError, ScrapedContent};

/// Firecrawl-compatible content fetcher
pub struct FirecrawlFetcher {
    client: Client,
    config: ScrapeConfig,
}

#[derive(Debug, Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'static str; 2],
}

#[derive(Debug, Deserialize)]
struct FirecrawlResponse {
    success: bool,
    #[serde(default)]
    data: Option<FirecrawlData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirecrawlData {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    metadata: serde_json::Value,
}

impl FirecrawlFetcher {
    /// Create a new fetcher; the request timeout bounds the whole call
    pub fn new(config: ScrapeConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the configuration
    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }
}

#[async_trait]
impl ContentFetcher for FirecrawlFetcher {
    async fn fetch(&self, url: &str) -> Result<ScrapedContent, FetchError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(FetchError::NotConfigured)?;

        debug!("Scraping {} via {}", url, self.config.api_url);

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&ScrapeRequest {
                url,
                formats: ["markdown", "html"],
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(url.to_string())
                } else {
                    FetchError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Scrape provider returned {} for {}", status, url);
            return Err(FetchError::HttpStatus(status.as_u16(), url.to_string()));
        }

        let body: FirecrawlResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::MalformedResponse(e.to_string())
            }
        })?;

        if !body.success {
            return Err(FetchError::Unsuccessful {
                url: url.to_string(),
                reason: body.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        let data = body
            .data
            .ok_or_else(|| FetchError::MalformedResponse("missing data".to_string()))?;
        let markdown = data
            .markdown
            .ok_or_else(|| FetchError::MalformedResponse("missing markdown".to_string()))?;
        let markdown = truncate_chars(markdown, self.config.max_markdown_chars);

        info!("Scraped {} markdown chars from {}", markdown.len(), url);

        Ok(ScrapedContent {
            url: url.to_string(),
            markdown,
            html: data.html,
            metadata: data.metadata,
        })
    }

    fn name(&self) -> &'static str {
        "firecrawl"
    }

    fn is_available(&self) -> bool {
        self.config.api_key.is_some()
    }
}

/// Cut `text` to at most `max_chars` characters; 0 leaves it untouched
fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if max_chars == 0 {
        return text;
    }
    if let Some((byte_index, _)) = text.char_indices().nth(max_chars) {
        text.truncate(byte_index);
    }
    text
}
