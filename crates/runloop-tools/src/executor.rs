// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use runloop_model::{ToolCallRequest, ToolCallResult};

/// Error returned by a [`ToolExecutor`] when it cannot produce a result at
/// all (as opposed to a tool-level failure, which is encoded as a
/// [`ToolCallResult`] with a non-empty `error`).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ToolExecError(pub String);

impl ToolExecError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// The concrete tool backend the dispatcher drives.
///
/// The per-call timeout and cancellation envelope are applied by the
/// dispatcher (`tokio::time::timeout` around this call), not by the
/// executor itself — implementations should simply do their work and
/// return.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: &ToolCallRequest) -> Result<ToolCallResult, ToolExecError>;
}
