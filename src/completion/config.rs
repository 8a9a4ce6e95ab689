// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the completion provider

use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_COMPLETION_URL: &str = "https://api.together.xyz/v1/chat/completions";

/// Configuration for the streamed completion client
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// OpenAI-compatible chat completions endpoint
    pub api_url: String,
    /// Bearer token for the provider
    pub api_key: Option<String>,
    /// TCP/TLS connect timeout (default: 10s)
    pub connect_timeout: Duration,
    /// Time allowed until response headers arrive (default: 30s)
    pub first_byte_timeout: Duration,
    /// Maximum silence between two stream chunks (default: 60s)
    pub idle_timeout: Duration,
}

impl CompletionConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            api_url: env::var("LLM_API_URL").unwrap_or(defaults.api_url),
            api_key: env::var("LLM_API_KEY")
                .or_else(|_| env::var("TOGETHER_API_KEY"))
                .ok()
                .filter(|k| !k.trim().is_empty()),
            connect_timeout: secs_from_env("LLM_CONNECT_TIMEOUT_SECS")
                .unwrap_or(defaults.connect_timeout),
            first_byte_timeout: secs_from_env("LLM_FIRST_BYTE_TIMEOUT_SECS")
                .unwrap_or(defaults.first_byte_timeout),
            idle_timeout: secs_from_env("LLM_IDLE_TIMEOUT_SECS")
                .unwrap_or(defaults.idle_timeout),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        Url::parse(&self.api_url).map_err(|e| format!("invalid completion api_url: {}", e))?;
        if self.connect_timeout.is_zero()
            || self.first_byte_timeout.is_zero()
            || self.idle_timeout.is_zero()
        {
            return Err("completion timeouts must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_COMPLETION_URL.to_string(),
            api_key: None,
            connect_timeout: Duration::from_secs(10),
            first_byte_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

fn secs_from_env(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .map(Duration::from_secs)
}
