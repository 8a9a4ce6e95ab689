// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Catalogue of models clients may request

use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_MODEL_ID: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo";

/// A model offered to chat clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ModelInfo {
    pub fn new(id: &str, name: &str, description: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
        }
    }
}

/// Models the gateway forwards to, plus the fallback for requests without one
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCatalog {
    pub models: Vec<ModelInfo>,
    pub default_model: String,
}

impl ModelCatalog {
    /// Load the catalogue from the environment
    ///
    /// `AVAILABLE_MODELS` is a comma-separated list of `id` or
    /// `id|Display Name` entries. `DEFAULT_MODEL` falls back to the first
    /// entry.
    pub fn from_env() -> Self {
        let models = env::var("AVAILABLE_MODELS")
            .ok()
            .map(|raw| parse_models(&raw))
            .filter(|models| !models.is_empty());

        let Some(models) = models else {
            let mut catalog = Self::default();
            if let Ok(default_model) = env::var("DEFAULT_MODEL") {
                if !default_model.trim().is_empty() {
                    catalog.default_model = default_model.trim().to_string();
                }
            }
            return catalog;
        };

        let default_model = env::var("DEFAULT_MODEL")
            .ok()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| models[0].id.clone());

        Self {
            models,
            default_model,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.models.is_empty() {
            return Err("at least one model must be configured".to_string());
        }
        if self.get(&self.default_model).is_none() {
            return Err(format!(
                "default model '{}' is not in the model catalogue",
                self.default_model
            ));
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Resolve a requested model id; empty or absent selects the default
    pub fn resolve(&self, requested: Option<&str>) -> Option<&ModelInfo> {
        match requested.map(str::trim).filter(|m| !m.is_empty()) {
            Some(id) => self.get(id),
            None => self.get(&self.default_model),
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.models.iter().map(|m| m.id.clone()).collect()
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: vec![
                ModelInfo::new(
                    DEFAULT_MODEL_ID,
                    "Llama 3.3 70B Turbo",
                    Some("Most capable model for diverse tasks"),
                ),
                ModelInfo::new(
                    "meta-llama/Llama-3.3-13B-Instruct",
                    "Llama 3.3 13B",
                    Some("Faster, more focused responses"),
                ),
            ],
            default_model: DEFAULT_MODEL_ID.to_string(),
        }
    }
}

fn parse_models(raw: &str) -> Vec<ModelInfo> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('|') {
            Some((id, name)) => ModelInfo::new(id.trim(), name.trim(), None),
            None => ModelInfo::new(entry, entry, None),
        })
        .collect()
}
