// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
use runloop_model::{ChatMessage, CompletionRequest, Model, ModelError, ModelResponse, ToolCallResult};
use tokio::sync::watch;

use crate::data::{RunInput, SystemPromptExtender};
use crate::state::RunState;

pub const ERROR_RECOVERY_MODE_DIRECTIVE: &str = "\n\n## ERROR_RECOVERY_MODE\nThe last tool calls failed repeatedly. Try a materially different approach: do not repeat the same arguments without a clear reason they would now succeed.\n";

pub const ACTION_EXECUTION_MODE_DIRECTIVE: &str = "\n\n## ACTION_EXECUTION_MODE\nYou deferred action in a previous turn. Either call a tool now or give a complete final answer. Do not defer again.\n";

/// A cancellation signal shared across suspension points: `true` once the
/// run should stop at the next opportunity. Dropping the paired sender
/// without ever setting it is equivalent to never cancelling.
pub type CancelSignal = watch::Receiver<bool>;

pub fn no_cancellation() -> CancelSignal {
    watch::channel(false).1
}

pub fn cancellation_channel() -> (watch::Sender<bool>, CancelSignal) {
    watch::channel(false)
}

pub fn is_cancelled(cancel: &CancelSignal) -> bool {
    *cancel.borrow()
}

async fn wait_for_cancellation(cancel: &mut CancelSignal) {
    loop {
        if *cancel.borrow() {
            return;
        }
        if cancel.changed().await.is_err() {
            // Sender dropped without ever cancelling: block forever so the
            // caller's `select!` just waits on the other branch.
            std::future::pending::<()>().await;
        }
    }
}

/// Races a model call against the ambient cancellation signal. `None`
/// means the run was cancelled before the model responded.
pub async fn call_model(
    model: &dyn Model,
    request: CompletionRequest,
    cancel: &mut CancelSignal,
) -> Option<Result<ModelResponse, ModelError>> {
    tokio::select! {
        biased;
        _ = wait_for_cancellation(cancel) => None,
        result = model.generate(request) => Some(result),
    }
}

/// Builds the system prompt for one iteration.
pub fn compose_system_prompt(
    base_prompt: &str,
    recovery_active: bool,
    action_execution_active: bool,
    extender: Option<&SystemPromptExtender>,
    history: &[ChatMessage],
    user_message: &str,
    tool_results: &[ToolCallResult],
) -> String {
    let mut prompt = base_prompt.to_string();
    if recovery_active {
        prompt.push_str(ERROR_RECOVERY_MODE_DIRECTIVE);
    }
    if action_execution_active {
        prompt.push_str(ACTION_EXECUTION_MODE_DIRECTIVE);
    }

    if let Some(ext) = extender {
        if let Ok(replacement) = ext(&prompt, history, user_message, tool_results) {
            let trimmed = replacement.trim();
            if !trimmed.is_empty() {
                prompt = trimmed.to_string();
            }
        }
    }

    prompt
}

/// Assembles the outbound request for one iteration.
pub fn build_request(
    input: &RunInput,
    state: &RunState,
    system_prompt: String,
    allowed_tools: Vec<String>,
    tool_timeout_ms: u64,
) -> CompletionRequest {
    CompletionRequest {
        agent_id: input.agent_id.clone(),
        run_id: input.run_id.clone(),
        system_prompt,
        messages: state.history.clone(),
        allowed_tools,
        tool_timeout_ms,
        user_message: input.user_message.clone(),
        tool_results: state.tool_results.clone(),
        on_text_delta: input.on_text_delta.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovery_directive_is_appended_when_active() {
        let prompt = compose_system_prompt("base", true, false, None, &[], "hi", &[]);
        assert!(prompt.starts_with("base"));
        assert!(prompt.contains("ERROR_RECOVERY_MODE"));
        assert!(!prompt.contains("ACTION_EXECUTION_MODE"));
    }

    #[test]
    fn extender_result_replaces_the_prompt_when_non_empty() {
        let extender: SystemPromptExtender =
            std::sync::Arc::new(|_base, _h, _m, _t| Ok("  replaced  ".to_string()));
        let prompt = compose_system_prompt("base", false, false, Some(&extender), &[], "hi", &[]);
        assert_eq!(prompt, "replaced");
    }

    #[test]
    fn extender_empty_result_is_ignored() {
        let extender: SystemPromptExtender = std::sync::Arc::new(|_b, _h, _m, _t| Ok(String::new()));
        let prompt = compose_system_prompt("base", false, false, Some(&extender), &[], "hi", &[]);
        assert_eq!(prompt, "base");
    }

    #[tokio::test]
    async fn cancellation_short_circuits_the_model_call() {
        let (tx, mut cancel) = cancellation_channel();
        tx.send(true).unwrap();
        let model = runloop_model::mock::EchoModel;
        let request = build_request(
            &RunInput::new("a", "r", "hi"),
            &RunState::new(),
            "sys".into(),
            vec![],
            1000,
        );
        let response = call_model(&model, request, &mut cancel).await;
        assert!(response.is_none());
    }
}
