// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use chat_gateway::{
    start_server, ChatGateway, CounterStore, FirecrawlFetcher, GatewayConfig,
    InMemoryCounterStore, OpenAiCompatibleProvider, RateLimiter, RedisCounterStore,
};
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Rate-limited, content-enriching chat completion gateway
#[derive(Parser, Debug)]
#[command(name = "chat-gateway")]
#[command(version)]
#[command(about = "Streams LLM chat completions with per-user rate limiting", long_about = None)]
struct Args {
    /// Listen host (overrides API_HOST)
    #[arg(long, env = "API_HOST")]
    host: Option<String>,

    /// Listen port (overrides API_PORT)
    #[arg(long, env = "API_PORT")]
    port: Option<u16>,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.log_format);

    info!("Starting chat gateway v{}", env!("CARGO_PKG_VERSION"));

    let mut config = GatewayConfig::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    let store: Arc<dyn CounterStore> = match config.rate_limit.redis_url.as_deref() {
        Some(url) => Arc::new(
            RedisCounterStore::new(url).context("invalid Redis counter store URL")?,
        ),
        None => {
            warn!("No Redis configured; rate limit counters are local to this process");
            Arc::new(InMemoryCounterStore::new())
        }
    };
    info!(
        "Rate limit: {} requests per {:?} (failure policy: {})",
        config.rate_limit.max_requests, config.rate_limit.window, config.rate_limit.failure_policy
    );

    let fetcher = FirecrawlFetcher::new(config.scrape.clone())
        .context("failed to build the scrape client")?;
    if config.scrape.api_key.is_none() {
        warn!("FIRECRAWL_API_KEY not set; website enrichment will always fall back");
    }

    let provider = OpenAiCompatibleProvider::new(config.completion.clone())
        .context("failed to build the completion client")?;
    if config.completion.api_key.is_none() {
        warn!("LLM_API_KEY not set; chat requests will be rejected");
    }

    let limiter = RateLimiter::new(store, config.rate_limit.clone());
    if !limiter.store_healthy().await {
        warn!(
            "Counter store '{}' not reachable within {:?}; requests follow the {} failure policy until it recovers",
            limiter.store_name(),
            config.rate_limit.store_timeout,
            config.rate_limit.failure_policy
        );
    }

    let gateway = ChatGateway::new(
        limiter,
        Arc::new(fetcher),
        Arc::new(provider),
        config.models.clone(),
        config.server.relay_buffer,
    );

    start_server(&config.server, gateway).await
}
