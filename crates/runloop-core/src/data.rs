// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use chrono::{DateTime, Utc};
use runloop_model::{ChatMessage, TextDeltaCallback, ToolCallRequest, ToolCallResult};

/// One document contributing to the assembled system prompt. Order matters;
/// the assembler never reorders documents.
#[derive(Debug, Clone)]
pub struct ArtifactDoc {
    pub name: String,
    pub content: String,
}

impl ArtifactDoc {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Invoked after every dispatched tool call (cache hit or fresh execution).
/// An `Err` is recorded on the record but never aborts the run.
pub type OnToolCall = Arc<dyn Fn(&ToolCallRecord) -> anyhow::Result<()> + Send + Sync>;

/// Invoked with (base prompt, history snapshot, current user message,
/// tool-results snapshot). A non-empty trimmed `Ok` result replaces the
/// system prompt for that iteration.
pub type SystemPromptExtender = Arc<
    dyn Fn(&str, &[ChatMessage], &str, &[ToolCallResult]) -> anyhow::Result<String> + Send + Sync,
>;

/// One executed (or cache-served) tool call, in dispatch order.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub request: ToolCallRequest,
    pub result: ToolCallResult,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub callback_error: Option<String>,
}

/// Everything one run needs, fixed for its whole lifetime.
pub struct RunInput {
    pub agent_id: String,
    pub run_id: String,
    pub user_message: String,
    pub prior_messages: Vec<ChatMessage>,
    pub artifact_docs: Vec<ArtifactDoc>,
    pub per_file_byte_limit: usize,
    /// `0` or `None` defers to the runner's configured default.
    pub max_tool_iterations: Option<u32>,
    pub tool_timeout_ms: Option<u64>,
    pub allowed_tools: Vec<String>,
    pub on_tool_call: Option<OnToolCall>,
    pub on_text_delta: Option<TextDeltaCallback>,
    pub system_prompt_extender: Option<SystemPromptExtender>,
    /// Appended after `FINAL_RESPONSE_MODE` in the finalizer's model-
    /// finalization attempt. `None` sends no second directive.
    pub finalizer_extra_directive: Option<String>,
}

impl RunInput {
    pub fn new(agent_id: impl Into<String>, run_id: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            run_id: run_id.into(),
            user_message: user_message.into(),
            prior_messages: Vec::new(),
            artifact_docs: Vec::new(),
            per_file_byte_limit: 0,
            max_tool_iterations: None,
            tool_timeout_ms: None,
            allowed_tools: Vec::new(),
            on_tool_call: None,
            on_text_delta: None,
            system_prompt_extender: None,
            finalizer_extra_directive: None,
        }
    }
}

/// Generates a fresh run id for callers that don't have one of their own
/// (e.g. a CLI front-end issuing a single ad-hoc run).
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The terminal result of one run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub assembled_prompt: String,
    pub final_text: String,
    pub reasoning: Option<String>,
    pub reasoning_present: bool,
    pub tool_parse_failure: bool,
    pub tool_calls: Vec<ToolCallRecord>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}
