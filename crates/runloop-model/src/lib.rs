// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
pub mod mock;
mod provider;
mod types;

pub use provider::Model;
pub use types::{
    ChatMessage, CompletionRequest, ModelError, ModelResponse, Role, TextDeltaCallback,
    ToolCallRequest, ToolCallResult,
};
