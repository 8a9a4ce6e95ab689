// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod completion;
pub mod config;
pub mod enrichment;
pub mod rate_limit;

// Re-export main types
pub use api::{create_router, start_server, ApiError, AppState, ChatGateway, ChatRequest};
pub use completion::{
    ChatMessage, CompletionConfig, CompletionProvider, OpenAiCompatibleProvider,
};
pub use config::{ConfigError, GatewayConfig, ModelCatalog, ServerConfig};
pub use enrichment::{ContentFetcher, FirecrawlFetcher, MessageAugmenter, ScrapeConfig};
pub use rate_limit::{
    CounterStore, FailurePolicy, InMemoryCounterStore, RateLimitConfig, RateLimiter,
    RedisCounterStore,
};
