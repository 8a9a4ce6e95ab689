//! Page content fetching for message augmentation
//!
//! ## Architecture
//!
//! ```text
//! hostname → https://{hostname} → ContentFetcher → scrape provider → markdown
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let fetcher = FirecrawlFetcher::new(ScrapeConfig::from_env())?;
//! let content = fetcher.fetch("https://example.com").await?;
//! ```

pub mod config;
pub mod fetcher;
pub mod firecrawl;

pub use config::ScrapeConfig;
pub use fetcher::{ContentFetcher, FetchError, ScrapedContent};
pub use firecrawl::FirecrawlFetcher;

#[cfg(test)]
pub use fetcher::MockContentFetcher;
