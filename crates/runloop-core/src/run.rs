// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use chrono::Utc;
use runloop_model::{ChatMessage, Model};
use runloop_tools::ToolExecutor;
use tracing::{info, instrument, warn};

use crate::data::{RunInput, RunOutput};
use crate::dispatcher::dispatch_tool_calls;
use crate::error::RunError;
use crate::finalizer::{self, guidance_final_text, recover_from_model_error, NON_ACTIONABLE_APOLOGY};
use crate::guards::{effective_cap, is_follow_through_deferral, FOLLOW_THROUGH_REPROMPT_CAP, NO_PROGRESS_THRESHOLD};
use crate::orchestrator::{build_request, call_model, compose_system_prompt, no_cancellation, CancelSignal};
use crate::prompt::{DefaultPromptAssembler, PromptAssembler};
use crate::state::RunState;

/// The two knobs the loop itself is sensitive to. Construct this from
/// `runloop_config::RunnerConfig` (or any other source) — this crate does
/// not read configuration files itself.
#[derive(Debug, Clone, Copy)]
pub struct RunnerDefaults {
    pub default_max_tool_iterations: u32,
    pub default_tool_timeout_ms: u64,
}

impl Default for RunnerDefaults {
    fn default() -> Self {
        Self {
            default_max_tool_iterations: 0,
            default_tool_timeout_ms: 900_000,
        }
    }
}

/// Owns the injected collaborators and exposes the single `run()`
/// operation. Build one per process; it holds no per-run state.
pub struct Runner {
    model: Option<Arc<dyn Model>>,
    tool_executor: Option<Arc<dyn ToolExecutor>>,
    prompt_assembler: Arc<dyn PromptAssembler>,
    defaults: RunnerDefaults,
}

impl Runner {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self {
            model: Some(model),
            tool_executor: None,
            prompt_assembler: Arc::new(DefaultPromptAssembler),
            defaults: RunnerDefaults::default(),
        }
    }

    /// Constructs a runner with no model — `run()` will fail fast with
    /// [`RunError::ModelRequired`]. Mostly useful for exercising the
    /// configuration-error path in tests.
    pub fn without_model() -> Self {
        Self {
            model: None,
            tool_executor: None,
            prompt_assembler: Arc::new(DefaultPromptAssembler),
            defaults: RunnerDefaults::default(),
        }
    }

    pub fn with_tool_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.tool_executor = Some(executor);
        self
    }

    pub fn with_prompt_assembler(mut self, assembler: Arc<dyn PromptAssembler>) -> Self {
        self.prompt_assembler = assembler;
        self
    }

    pub fn with_defaults(mut self, defaults: RunnerDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub async fn run(&self, input: RunInput) -> Result<RunOutput, RunError> {
        self.run_cancellable(input, &mut no_cancellation()).await
    }

    #[instrument(skip_all, fields(agent_id = %input.agent_id, run_id = %input.run_id))]
    pub async fn run_cancellable(
        &self,
        input: RunInput,
        cancel: &mut CancelSignal,
    ) -> Result<RunOutput, RunError> {
        let started_at = Utc::now();
        let model = self.model.as_ref().ok_or(RunError::ModelRequired)?;

        let assembled_prompt = self
            .prompt_assembler
            .assemble(&input.artifact_docs, input.per_file_byte_limit);

        let mut state = RunState::new();
        state.history = input.prior_messages.clone();

        let cap = effective_cap(input.max_tool_iterations, self.defaults.default_max_tool_iterations);
        let tool_timeout_ms = input
            .tool_timeout_ms
            .unwrap_or(self.defaults.default_tool_timeout_ms);

        loop {
            if *cancel.borrow() {
                return Ok(finish_output(assembled_prompt, String::new(), &state, started_at));
            }

            if state.tool_iterations >= cap {
                if state.tool_call_records.is_empty() {
                    return Err(RunError::ToolIterationCapExceeded);
                }
                info!(cap, "iteration cap reached, finalizing");
                let text = finalizer::finalize(
                    model.as_ref(),
                    &input,
                    &state,
                    &assembled_prompt,
                    tool_timeout_ms,
                    cap,
                    cancel,
                )
                .await;
                return Ok(finish_output(assembled_prompt, text, &state, started_at));
            }

            let system_prompt = compose_system_prompt(
                &assembled_prompt,
                state.failure_state.recovery_active,
                state.follow_through_reprompts > 0,
                input.system_prompt_extender.as_ref(),
                &state.history,
                &input.user_message,
                &state.tool_results,
            );

            let request = build_request(
                &input,
                &state,
                system_prompt,
                input.allowed_tools.clone(),
                tool_timeout_ms,
            );

            let response = match call_model(model.as_ref(), request, cancel).await {
                None => {
                    return Ok(finish_output(assembled_prompt, String::new(), &state, started_at));
                }
                Some(Ok(response)) => response,
                Some(Err(e)) => {
                    if !state.tool_call_records.is_empty() {
                        warn!(error = %e, "model error after tools ran, synthesizing recovery text");
                        let text = recover_from_model_error(&e.to_string(), &state.tool_call_records);
                        return Ok(finish_output(assembled_prompt, text, &state, started_at));
                    }
                    return Err(RunError::Model(e.to_string()));
                }
            };

            if let Some(reasoning) = &response.reasoning {
                let trimmed = reasoning.trim();
                if !trimmed.is_empty() {
                    state.latest_reasoning = Some(trimmed.to_string());
                }
            }
            if response.reasoning_present {
                state.reasoning_present = true;
            }
            if response.tool_parse_failure {
                state.tool_parse_failure = true;
            }

            if response.tool_calls.is_empty() {
                let can_defer = !input.allowed_tools.is_empty() && state.tool_call_records.is_empty();
                if can_defer && is_follow_through_deferral(&response.final_text) {
                    if state.follow_through_reprompts < FOLLOW_THROUGH_REPROMPT_CAP {
                        if !response.final_text.trim().is_empty() {
                            state.history.push(ChatMessage::assistant(response.final_text.clone()));
                        }
                        state.follow_through_reprompts += 1;
                        continue;
                    }
                    return Ok(finish_output(
                        assembled_prompt,
                        NON_ACTIONABLE_APOLOGY.to_string(),
                        &state,
                        started_at,
                    ));
                }
                return Ok(finish_output(
                    assembled_prompt,
                    response.final_text.trim().to_string(),
                    &state,
                    started_at,
                ));
            }

            let executor = match &self.tool_executor {
                Some(e) => e.clone(),
                None => return Err(RunError::ToolExecutorRequired),
            };

            if !response.final_text.trim().is_empty() {
                state
                    .history
                    .push(ChatMessage::assistant(response.final_text.clone()));
            }

            let outcome = dispatch_tool_calls(
                &mut state,
                response.tool_calls,
                executor.as_ref(),
                tool_timeout_ms,
                input.on_tool_call.as_ref(),
            )
            .await;
            state.tool_iterations += 1;

            if outcome.had_fresh_execution {
                state.no_progress_counter = 0;
            } else {
                state.no_progress_counter += 1;
            }

            if state.no_progress_counter >= NO_PROGRESS_THRESHOLD && !state.tool_call_records.is_empty() {
                info!("no-progress threshold reached, finalizing");
                let text = finalizer::finalize(
                    model.as_ref(),
                    &input,
                    &state,
                    &assembled_prompt,
                    tool_timeout_ms,
                    cap,
                    cancel,
                )
                .await;
                return Ok(finish_output(assembled_prompt, text, &state, started_at));
            }

            if state.failure_state.should_escalate_to_guidance() && !state.tool_call_records.is_empty() {
                let text = guidance_final_text(&input.user_message, &state.tool_call_records);
                return Ok(finish_output(assembled_prompt, text, &state, started_at));
            }
        }
    }
}

fn finish_output(
    assembled_prompt: String,
    final_text: String,
    state: &RunState,
    started_at: chrono::DateTime<Utc>,
) -> RunOutput {
    RunOutput {
        assembled_prompt,
        final_text,
        reasoning: state.latest_reasoning.clone(),
        reasoning_present: state.reasoning_present,
        tool_parse_failure: state.tool_parse_failure,
        tool_calls: state.tool_call_records.clone(),
        started_at,
        completed_at: Utc::now(),
    }
}
