// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use super::errors::ApiError;
use crate::completion::ChatMessage;
use crate::config::ModelInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Caller identity, used as the rate-limit key
    pub user_id: String,
    /// Conversation so far, oldest first; the last entry is the new question
    pub messages: Vec<ChatMessage>,
    /// Model id; empty selects the default model
    #[serde(default)]
    pub model: String,
}

impl ChatRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.user_id.trim().is_empty() {
            return Err(ApiError::ValidationError {
                field: "userId".to_string(),
                message: "userId is required".to_string(),
            });
        }

        let Some(last) = self.messages.last() else {
            return Err(ApiError::ValidationError {
                field: "messages".to_string(),
                message: "messages must not be empty".to_string(),
            });
        };

        if !last.is_user {
            return Err(ApiError::ValidationError {
                field: "messages".to_string(),
                message: "the last message must be from the user".to_string(),
            });
        }

        Ok(())
    }

    pub fn requested_model(&self) -> Option<&str> {
        Some(self.model.as_str()).filter(|m| !m.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub default_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,
}

/// Terminal payload of a successful stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DonePayload {
    pub finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<crate::completion::Usage>,
}
