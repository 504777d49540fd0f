// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use runloop_model::{ToolCallRequest, ToolCallResult};

use crate::{ToolExecError, ToolExecutor};

/// Routes each call by tool name to a pre-scripted queue of outputs.
/// Also counts how many times each name was actually invoked, so tests can
/// assert on cache-hit behavior.
#[derive(Default)]
pub struct ScriptedToolExecutor {
    outputs: Mutex<HashMap<String, Vec<Result<String, String>>>>,
    call_counts: Mutex<HashMap<String, usize>>,
}

impl ScriptedToolExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful output for `name`. Calls to the same name pop in
    /// FIFO order; once exhausted the last entry repeats.
    pub fn on_ok(&self, name: impl Into<String>, output: impl Into<String>) -> &Self {
        self.outputs
            .lock()
            .unwrap()
            .entry(name.into())
            .or_default()
            .push(Ok(output.into()));
        self
    }

    pub fn on_err(&self, name: impl Into<String>, error: impl Into<String>) -> &Self {
        self.outputs
            .lock()
            .unwrap()
            .entry(name.into())
            .or_default()
            .push(Err(error.into()));
        self
    }

    pub fn call_count(&self, name: &str) -> usize {
        *self.call_counts.lock().unwrap().get(name).unwrap_or(&0)
    }
}

#[async_trait]
impl ToolExecutor for ScriptedToolExecutor {
    async fn execute(&self, call: &ToolCallRequest) -> Result<ToolCallResult, ToolExecError> {
        *self
            .call_counts
            .lock()
            .unwrap()
            .entry(call.name.clone())
            .or_insert(0) += 1;

        let mut outputs = self.outputs.lock().unwrap();
        let queue = outputs
            .get_mut(&call.name)
            .ok_or_else(|| ToolExecError::new(format!("unscripted tool: {}", call.name)))?;
        let next = if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue
                .first()
                .cloned()
                .ok_or_else(|| ToolExecError::new(format!("no script left for {}", call.name)))?
        };

        match next {
            Ok(output) => Ok(ToolCallResult {
                id: call.id.clone(),
                output,
                error: String::new(),
            }),
            Err(error) => Ok(ToolCallResult {
                id: call.id.clone(),
                output: String::new(),
                error,
            }),
        }
    }
}

/// Never returns — used to exercise the per-call timeout path.
pub struct HangingToolExecutor;

#[async_trait]
impl ToolExecutor for HangingToolExecutor {
    async fn execute(&self, _call: &ToolCallRequest) -> Result<ToolCallResult, ToolExecError> {
        loop {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }
}

/// Returns `Err` unconditionally — exercises the hard executor-failure path
/// (distinct from a tool that *returns* a `ToolCallResult.error`).
pub struct AlwaysFailingToolExecutor(pub String);

#[async_trait]
impl ToolExecutor for AlwaysFailingToolExecutor {
    async fn execute(&self, _call: &ToolCallRequest) -> Result<ToolCallResult, ToolExecError> {
        Err(ToolExecError::new(self.0.clone()))
    }
}

/// Counts invocations and echoes the call's arguments back as output.
/// Handy when a test only cares that the executor was (or wasn't) invoked.
#[derive(Default)]
pub struct EchoToolExecutor {
    calls: AtomicUsize,
}

impl EchoToolExecutor {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolExecutor for EchoToolExecutor {
    async fn execute(&self, call: &ToolCallRequest) -> Result<ToolCallResult, ToolExecError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ToolCallResult {
            id: call.id.clone(),
            output: call.arguments.clone(),
            error: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_executor_repeats_last_entry_once_exhausted() {
        let exec = ScriptedToolExecutor::new();
        exec.on_ok("fs.read", "first");

        let call = ToolCallRequest {
            id: "1".into(),
            name: "fs.read".into(),
            arguments: "{}".into(),
        };
        let r1 = exec.execute(&call).await.unwrap();
        let r2 = exec.execute(&call).await.unwrap();
        assert_eq!(r1.output, "first");
        assert_eq!(r2.output, "first");
        assert_eq!(exec.call_count("fs.read"), 2);
    }

    #[tokio::test]
    async fn unscripted_tool_errors() {
        let exec = ScriptedToolExecutor::new();
        let call = ToolCallRequest {
            id: "1".into(),
            name: "unknown".into(),
            arguments: "{}".into(),
        };
        assert!(exec.execute(&call).await.is_err());
    }

    #[tokio::test]
    async fn echo_executor_counts_calls() {
        let exec = EchoToolExecutor::default();
        let call = ToolCallRequest {
            id: "1".into(),
            name: "echo".into(),
            arguments: "{\"x\":1}".into(),
        };
        exec.execute(&call).await.unwrap();
        exec.execute(&call).await.unwrap();
        assert_eq!(exec.call_count(), 2);
    }
}
