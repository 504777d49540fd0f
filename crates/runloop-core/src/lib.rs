// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
mod data;
mod dispatcher;
mod error;
mod finalizer;
mod guards;
mod orchestrator;
mod prompt;
mod run;
mod state;

pub use data::{new_run_id, ArtifactDoc, OnToolCall, RunInput, RunOutput, SystemPromptExtender, ToolCallRecord};
pub use error::RunError;
pub use orchestrator::{cancellation_channel, no_cancellation, CancelSignal};
pub use prompt::{assemble, truncate_bytes, DefaultPromptAssembler, PromptAssembler};
pub use run::{Runner, RunnerDefaults};
