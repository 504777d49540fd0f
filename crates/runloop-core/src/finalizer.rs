// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
use runloop_model::{CompletionRequest, Model, ModelResponse};

use crate::data::{RunInput, ToolCallRecord};
use crate::orchestrator::{call_model, CancelSignal};
use crate::state::RunState;

pub const FINAL_RESPONSE_MODE_DIRECTIVE: &str = "\n\n## FINAL_RESPONSE_MODE\nNo further tool calls are available. Answer using only the information already gathered. If something could not be completed, explain plainly what failed and why.\n";

const FALLBACK_HEADER: &str =
    "I reached the tool-iteration limit before producing a final answer. Here is what the last tool calls returned:";

pub const NON_ACTIONABLE_APOLOGY: &str = "I wasn't able to take concrete action on this request after repeated attempts. Could you clarify exactly what you'd like me to do, or provide any missing information?";

const MAX_RENDERED_OUTPUT_CHARS: usize = 1200;

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push('\u{2026}');
        out
    }
}

fn render_last_results(records: &[ToolCallRecord], take: usize) -> String {
    let start = records.len().saturating_sub(take);
    let mut out = String::new();
    for (i, rec) in records[start..].iter().enumerate() {
        let idx = start + i + 1;
        if rec.result.is_error() {
            out.push_str(&format!("- [{idx}] error: {}", rec.result.error));
            if !rec.result.output.is_empty() {
                out.push_str(&format!(
                    " (output: {})",
                    truncate_chars(&rec.result.output, MAX_RENDERED_OUTPUT_CHARS)
                ));
            }
            out.push('\n');
        } else {
            out.push_str(&format!(
                "- [{idx}] output: {}\n",
                truncate_chars(&rec.result.output, MAX_RENDERED_OUTPUT_CHARS)
            ));
        }
    }
    out
}

/// Deterministic fallback text built from the last ≤5 tool results when the
/// model finalization call yields nothing usable.
pub fn fallback_final_text(records: &[ToolCallRecord], cap: u32) -> String {
    let mut out = String::new();
    out.push_str(FALLBACK_HEADER);
    out.push('\n');
    out.push_str(&render_last_results(records, 5));
    out.push_str(&format!("(iteration cap: {cap})\n"));
    out
}

/// Final text synthesized when the model backend itself errored, but at
/// least one tool already ran.
pub fn recover_from_model_error(error: &str, records: &[ToolCallRecord]) -> String {
    let mut out = format!(
        "The model backend returned an error: {error}\n\nHere is what the last tool calls returned:\n"
    );
    out.push_str(&render_last_results(records, 5));
    out
}

/// User-guidance exit text when the Failure State Machine escalates.
pub fn guidance_final_text(user_message: &str, records: &[ToolCallRecord]) -> String {
    let mut out = format!(
        "I'm having repeated trouble completing this request: \"{user_message}\".\n\nThe following tool calls failed:\n"
    );
    let failing: Vec<&ToolCallRecord> = records.iter().filter(|r| r.result.is_error()).collect();
    let start = failing.len().saturating_sub(6);
    for rec in &failing[start..] {
        out.push_str(&format!(
            "- {} (args: {}) -> error: {} (output: {})\n",
            rec.request.name,
            truncate_chars(&rec.request.arguments, 300),
            rec.result.error,
            truncate_chars(&rec.result.output, 300)
        ));
    }
    out.push_str("\nHow would you like me to proceed?");
    out
}

/// One more tool-less model call, with tools forced empty.
/// Returns `None` if cancelled, `Some(Err)` if the backend errored, or
/// `Some(Ok(response))` — the caller must still check `tool_calls.is_empty()`
/// since a model that ignores the directive falls through to the fallback.
pub async fn finalize_with_model(
    model: &dyn Model,
    input: &RunInput,
    state: &RunState,
    base_prompt: &str,
    extra_directive: Option<&str>,
    tool_timeout_ms: u64,
    cancel: &mut CancelSignal,
) -> Option<Result<ModelResponse, runloop_model::ModelError>> {
    let mut prompt = base_prompt.to_string();
    prompt.push_str(FINAL_RESPONSE_MODE_DIRECTIVE);
    if let Some(extra) = extra_directive {
        prompt.push_str(extra);
    }

    let request = CompletionRequest {
        agent_id: input.agent_id.clone(),
        run_id: input.run_id.clone(),
        system_prompt: prompt,
        messages: state.history.clone(),
        allowed_tools: Vec::new(),
        tool_timeout_ms,
        user_message: input.user_message.clone(),
        tool_results: state.tool_results.clone(),
        on_text_delta: input.on_text_delta.clone(),
    };

    call_model(model, request, cancel).await
}

/// Runs the full Finalizer: tries the model once, falls back to
/// deterministic formatting if it's cancelled, errors, or still emits tool
/// calls.
pub async fn finalize(
    model: &dyn Model,
    input: &RunInput,
    state: &RunState,
    base_prompt: &str,
    tool_timeout_ms: u64,
    cap: u32,
    cancel: &mut CancelSignal,
) -> String {
    let extra_directive = input.finalizer_extra_directive.as_deref();
    match finalize_with_model(model, input, state, base_prompt, extra_directive, tool_timeout_ms, cancel).await {
        Some(Ok(resp)) if resp.tool_calls.is_empty() => resp.final_text.trim().to_string(),
        _ => fallback_final_text(&state.tool_call_records, cap),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runloop_model::ToolCallResult;

    fn record(output: &str, error: &str) -> ToolCallRecord {
        ToolCallRecord {
            request: runloop_model::ToolCallRequest {
                id: "1".into(),
                name: "fs.read".into(),
                arguments: "{}".into(),
            },
            result: ToolCallResult {
                id: "1".into(),
                output: output.into(),
                error: error.into(),
            },
            started_at: chrono::Utc::now(),
            completed_at: chrono::Utc::now(),
            callback_error: None,
        }
    }

    #[test]
    fn fallback_mentions_the_cap_and_the_last_results() {
        let records = vec![record("hello", "")];
        let text = fallback_final_text(&records, 3);
        assert!(text.contains("iteration cap: 3"));
        assert!(text.contains("hello"));
    }

    #[test]
    fn fallback_only_renders_the_last_five() {
        let records: Vec<_> = (0..8).map(|i| record(&format!("out{i}"), "")).collect();
        let text = fallback_final_text(&records, 10);
        assert!(!text.contains("out0"));
        assert!(text.contains("out7"));
    }

    #[test]
    fn guidance_text_lists_failing_calls() {
        let records = vec![record("", "boom")];
        let text = guidance_final_text("do the thing", &records);
        assert!(text.contains("do the thing"));
        assert!(text.contains("boom"));
    }

    #[tokio::test]
    async fn finalize_forwards_the_caller_supplied_extra_directive() {
        let model = runloop_model::mock::ScriptedModel::new(vec![ModelResponse {
            final_text: "ok".into(),
            ..Default::default()
        }]);
        let mut input = RunInput::new("agent-1", "run-1", "hi");
        input.finalizer_extra_directive = Some("\n## EXTRA\ndo X\n".into());
        let state = RunState::new();
        let mut cancel = crate::orchestrator::no_cancellation();

        let text = finalize(&model, &input, &state, "base", 1000, 5, &mut cancel).await;

        assert_eq!(text, "ok");
        let requests = model.requests.lock().unwrap();
        assert!(requests[0].system_prompt.contains("## EXTRA\ndo X"));
    }
}
