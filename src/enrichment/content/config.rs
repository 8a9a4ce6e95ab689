//! Configuration for the scrape provider
//!
//! Defines the endpoint, credentials, timeout and content limits used when
//! fetching page content for a detected domain.

use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_SCRAPE_URL: &str = "https://api.firecrawl.dev/v1/scrape";

/// Configuration for content fetching
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Scrape endpoint (default: Firecrawl v1 scrape)
    pub api_url: String,
    /// Bearer token for the scrape provider; fetching is disabled when None
    pub api_key: Option<String>,
    /// Timeout for the single scrape request (default: 10s)
    pub request_timeout: Duration,
    /// Cap on returned markdown characters, 0 = unlimited (default: 0)
    pub max_markdown_chars: usize,
}

impl ScrapeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            api_url: env::var("FIRECRAWL_API_URL")
                .unwrap_or_else(|_| DEFAULT_SCRAPE_URL.to_string()),
            api_key: env::var("FIRECRAWL_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            request_timeout: env::var("SCRAPE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(10)),
            max_markdown_chars: env::var("SCRAPE_MAX_MARKDOWN_CHARS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        Url::parse(&self.api_url).map_err(|e| format!("invalid scrape api_url: {}", e))?;
        if self.request_timeout.is_zero() {
            return Err("request_timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_SCRAPE_URL.to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(10),
            max_markdown_chars: 0,
        }
    }
}
