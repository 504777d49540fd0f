// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;

use chrono::Utc;
use runloop_model::{ToolCallRequest, ToolCallResult};
use runloop_tools::ToolExecutor;
use tracing::{debug, warn};

use crate::data::{OnToolCall, ToolCallRecord};
use crate::state::RunState;

/// Result of dispatching every tool call the model requested in one
/// iteration.
pub struct DispatchOutcome {
    pub had_fresh_execution: bool,
}

/// Runs each call through ID assignment, cache lookup, execution, cache
/// update, and outcome notification, in order.
pub async fn dispatch_tool_calls(
    state: &mut RunState,
    calls: Vec<ToolCallRequest>,
    executor: &dyn ToolExecutor,
    timeout_ms: u64,
    on_tool_call: Option<&OnToolCall>,
) -> DispatchOutcome {
    let mut had_fresh_execution = false;

    for raw_call in calls {
        let id = state.assign_unique_id(&raw_call.id);
        let fingerprint = RunState::fingerprint(&raw_call.name, &raw_call.arguments);
        let started_at = Utc::now();

        let result = if let Some(fp) = fingerprint.as_deref() {
            if let Some(cached_output) = state.success_cache_get(fp) {
                debug!(tool = %raw_call.name, %fp, "tool call served from success cache");
                state.failure_state.on_success();
                ToolCallResult {
                    id: id.clone(),
                    output: cached_output,
                    error: String::new(),
                }
            } else if let Some((cached_output, cached_error)) = state.failed_cache_get(fp) {
                debug!(tool = %raw_call.name, %fp, "tool call served from failed-repeat cache");
                state.failure_state.on_failure();
                ToolCallResult {
                    id: id.clone(),
                    output: cached_output,
                    error: cached_error,
                }
            } else {
                let result = execute_and_classify(&id, &raw_call, executor, timeout_ms).await;
                had_fresh_execution = true;
                apply_cache_update(state, Some(fp), &result);
                result
            }
        } else {
            let result = execute_and_classify(&id, &raw_call, executor, timeout_ms).await;
            had_fresh_execution = true;
            apply_cache_update(state, None, &result);
            result
        };

        let completed_at = Utc::now();
        let mut record = ToolCallRecord {
            request: ToolCallRequest {
                id: id.clone(),
                name: raw_call.name.clone(),
                arguments: raw_call.arguments.clone(),
            },
            result: result.clone(),
            started_at,
            completed_at,
            callback_error: None,
        };

        if let Some(cb) = on_tool_call {
            if let Err(e) = cb(&record) {
                warn!(tool = %raw_call.name, error = %e, "on_tool_call callback failed");
                record.callback_error = Some(e.to_string().trim().to_string());
            }
        }

        let tool_result_content = if result.is_error() {
            format!("error: {}", result.error)
        } else {
            result.output.clone()
        };
        state
            .history
            .push(runloop_model::ChatMessage::tool_result(id, tool_result_content));

        state.tool_results.push(record.result.clone());
        state.tool_call_records.push(record);
    }

    DispatchOutcome { had_fresh_execution }
}

async fn execute_and_classify(
    id: &str,
    call: &ToolCallRequest,
    executor: &dyn ToolExecutor,
    timeout_ms: u64,
) -> ToolCallResult {
    let exec_call = ToolCallRequest {
        id: id.to_string(),
        name: call.name.clone(),
        arguments: call.arguments.clone(),
    };
    let deadline = Duration::from_millis(timeout_ms.max(1));

    let mut result = match tokio::time::timeout(deadline, executor.execute(&exec_call)).await {
        Ok(Ok(mut r)) => {
            r.id = id.to_string();
            r
        }
        Ok(Err(e)) => ToolCallResult {
            id: id.to_string(),
            output: String::new(),
            error: e.0,
        },
        Err(_) => ToolCallResult {
            id: id.to_string(),
            output: String::new(),
            error: format!("timeout: tool execution exceeded {timeout_ms}ms"),
        },
    };

    infer_error_from_output(&mut result);
    result
}

/// If the call reported no error but its output is JSON-shaped with an
/// `error` field or a non-zero `exit_code`, promote that into `result.error`.
fn infer_error_from_output(result: &mut ToolCallResult) {
    if result.is_error() {
        return;
    }
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&result.output) else {
        return;
    };
    if let Some(err_val) = value.get("error") {
        if let Some(s) = err_val.as_str() {
            if !s.is_empty() {
                result.error = s.to_string();
                return;
            }
        } else if !err_val.is_null() {
            result.error = err_val.to_string();
            return;
        }
    }
    if let Some(code) = value.get("exit_code").and_then(|v| v.as_i64()) {
        if code != 0 {
            result.error = format!("exit_code: {code}");
        }
    }
}

fn apply_cache_update(state: &mut RunState, fingerprint: Option<&str>, result: &ToolCallResult) {
    if result.is_error() {
        state.failure_state.on_failure();
        if let Some(fp) = fingerprint {
            state.record_failure(fp, &result.output, &result.error);
        }
    } else {
        state.failure_state.on_success();
        if let Some(fp) = fingerprint {
            state.record_success(fp, &result.output);
        }
    }
}
