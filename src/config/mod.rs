// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Gateway configuration
//!
//! Everything is read from the environment (a `.env` file is loaded by the
//! binary first). Each subsystem owns its section; [`GatewayConfig`]
//! assembles and validates them together.

pub mod models;

pub use models::{ModelCatalog, ModelInfo, DEFAULT_MODEL_ID};

use std::env;
use thiserror::Error;

use crate::completion::CompletionConfig;
use crate::enrichment::ScrapeConfig;
use crate::rate_limit::RateLimitConfig;

/// Configuration errors, reported at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid server configuration: {0}")]
    Server(String),

    #[error("Invalid rate limit configuration: {0}")]
    RateLimit(String),

    #[error("Invalid scrape configuration: {0}")]
    Scrape(String),

    #[error("Invalid completion configuration: {0}")]
    Completion(String),

    #[error("Invalid model configuration: {0}")]
    Models(String),
}

/// HTTP listener settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty or `*` allows any origin
    pub cors_allowed_origins: Vec<String>,
    /// Frames buffered between the provider relay and a slow client
    pub relay_buffer: usize,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env::var("API_HOST").unwrap_or(defaults.host),
            port: env::var("API_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_allowed_origins),
            relay_buffer: env::var("RELAY_BUFFER_FRAMES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.relay_buffer),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host must not be empty".to_string());
        }
        if self.relay_buffer == 0 {
            return Err("relay buffer must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_allowed_origins: vec!["*".to_string()],
            relay_buffer: 64,
        }
    }
}

/// Complete gateway configuration
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub scrape: ScrapeConfig,
    pub completion: CompletionConfig,
    pub models: ModelCatalog,
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
            scrape: ScrapeConfig::from_env(),
            completion: CompletionConfig::from_env(),
            models: ModelCatalog::from_env(),
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate().map_err(ConfigError::Server)?;
        self.rate_limit.validate().map_err(ConfigError::RateLimit)?;
        self.scrape.validate().map_err(ConfigError::Scrape)?;
        self.completion.validate().map_err(ConfigError::Completion)?;
        self.models.validate().map_err(ConfigError::Models)?;
        Ok(())
    }
}
