// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a [`ChatMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// One entry in the visible conversation. The loop appends to a `Vec` of
/// these but never reorders or rewrites past entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Set on `Role::Tool` messages: the tool name that produced `content`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Set on `Role::Tool` messages: the [`ToolCallRequest::id`] this result
    /// answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            name: None,
            tool_call_id: None,
            timestamp: Some(Utc::now()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name: None,
            tool_call_id: None,
            timestamp: Some(Utc::now()),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            name: None,
            tool_call_id: None,
            timestamp: Some(Utc::now()),
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            name: None,
            tool_call_id: Some(tool_call_id.into()),
            timestamp: Some(Utc::now()),
        }
    }
}

/// A tool invocation as returned by the model, before the dispatcher has
/// assigned it a final, run-unique `id`.
///
/// `arguments` is carried as the raw JSON text the model produced (or the
/// backend re-serialized) and is never re-parsed by the core — the
/// duplicate-detection fingerprint depends on these being the literal
/// bytes, not a canonicalized form.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// The outcome of executing one [`ToolCallRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolCallResult {
    pub id: String,
    pub output: String,
    /// Empty string denotes success.
    pub error: String,
}

impl ToolCallResult {
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// Invoked with each streamed text delta. Must be non-blocking — it runs on
/// whatever task produces the delta.
pub type TextDeltaCallback = Arc<dyn Fn(&str) -> anyhow::Result<()> + Send + Sync>;

/// One outbound request to the model backend.
#[derive(Clone)]
pub struct CompletionRequest {
    pub agent_id: String,
    pub run_id: String,
    pub system_prompt: String,
    /// Defensive snapshot of the conversation so far.
    pub messages: Vec<ChatMessage>,
    /// Defensive snapshot of the allowed tool names for this call. Forced
    /// empty during finalization.
    pub allowed_tools: Vec<String>,
    pub tool_timeout_ms: u64,
    pub user_message: String,
    /// Defensive snapshot of tool results accumulated so far this run.
    pub tool_results: Vec<ToolCallResult>,
    pub on_text_delta: Option<TextDeltaCallback>,
}

/// The model's reply to a [`CompletionRequest`].
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    pub final_text: String,
    pub reasoning: Option<String>,
    pub reasoning_present: bool,
    pub tool_parse_failure: bool,
    pub tool_calls: Vec<ToolCallRequest>,
}

/// Errors a [`crate::Model`] implementation may return. The core treats all
/// of these as recoverable "model errors" unless no tool result
/// exists yet, in which case they propagate.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Request(String),
    #[error("model response could not be parsed: {0}")]
    Parse(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
