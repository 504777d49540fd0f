// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;
use std::time::Duration;

use runloop_core::{ArtifactDoc, RunError, RunInput, Runner};
use runloop_model::mock::ScriptedModel;
use runloop_model::{ModelResponse, ToolCallRequest};
use runloop_tools::mock::{AlwaysFailingToolExecutor, EchoToolExecutor, HangingToolExecutor, ScriptedToolExecutor};

fn tool_call(name: &str, arguments: &str) -> ToolCallRequest {
    ToolCallRequest {
        id: String::new(),
        name: name.into(),
        arguments: arguments.into(),
    }
}

fn base_input(user_message: &str, allowed_tools: &[&str]) -> RunInput {
    let mut input = RunInput::new("agent-1", "run-1", user_message);
    input.allowed_tools = allowed_tools.iter().map(|s| s.to_string()).collect();
    input
}

#[tokio::test]
async fn happy_path_returns_final_text_and_one_tool_record() {
    let model = Arc::new(ScriptedModel::new(vec![
        ModelResponse {
            tool_calls: vec![tool_call("time.now", "{}")],
            ..Default::default()
        },
        ModelResponse {
            final_text: "done".into(),
            ..Default::default()
        },
    ]));
    let executor = Arc::new(ScriptedToolExecutor::new());
    executor.on_ok("time.now", "2026-02-15T00:00:00Z");

    let runner = Runner::new(model.clone()).with_tool_executor(executor);
    let output = runner
        .run(base_input("What time is it?", &["time.now"]))
        .await
        .unwrap();

    assert_eq!(output.final_text, "done");
    assert_eq!(output.tool_calls.len(), 1);

    let requests = model.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].tool_results[0].output, "2026-02-15T00:00:00Z");
}

#[tokio::test]
async fn cap_reached_falls_back_gracefully() {
    let model = Arc::new(ScriptedModel::new(vec![
        ModelResponse {
            tool_calls: vec![tool_call("alpha.step", "{}")],
            ..Default::default()
        },
        ModelResponse {
            // The finalizer's tool-less call; the model ignores the
            // directive and asks for another tool, so the fallback takes
            // over instead.
            tool_calls: vec![tool_call("beta.step", "{}")],
            ..Default::default()
        },
    ]));
    let executor = Arc::new(ScriptedToolExecutor::new());
    executor.on_ok("alpha.step", "alpha-output");

    let runner = Runner::new(model).with_tool_executor(executor);
    let mut input = base_input("do the thing", &["alpha.step", "beta.step"]);
    input.max_tool_iterations = Some(1);

    let output = runner.run(input).await.unwrap();

    assert_eq!(output.tool_calls.len(), 1);
    assert!(output.final_text.contains("iteration cap: 1"));
    assert!(output.final_text.contains("alpha-output"));
}

#[tokio::test]
async fn slow_tool_times_out_within_the_configured_deadline() {
    let model = Arc::new(ScriptedModel::new(vec![ModelResponse {
        tool_calls: vec![tool_call("slow.op", "{}")],
        ..Default::default()
    }]));
    let executor = Arc::new(HangingToolExecutor);

    let runner = Runner::new(model).with_tool_executor(executor);
    let mut input = base_input("run the slow op", &["slow.op"]);
    input.tool_timeout_ms = Some(20);

    let result = tokio::time::timeout(Duration::from_millis(500), runner.run(input))
        .await
        .expect("run should finish well within 500ms");
    let output = result.unwrap();

    assert_eq!(output.tool_calls.len(), 1);
    assert!(output.tool_calls[0]
        .result
        .error
        .starts_with("timeout: tool execution exceeded 20ms"));
}

#[tokio::test]
async fn duplicate_calls_in_one_iteration_hit_the_executor_once() {
    let model = Arc::new(ScriptedModel::new(vec![
        ModelResponse {
            tool_calls: vec![
                tool_call("fs.read", "{\"path\":\"a\"}"),
                tool_call("fs.read", "{\"path\":\"a\"}"),
                tool_call("fs.read", "{\"path\":\"a\"}"),
            ],
            ..Default::default()
        },
        ModelResponse {
            final_text: "done".into(),
            ..Default::default()
        },
    ]));
    let executor = Arc::new(EchoToolExecutor::default());

    let runner = Runner::new(model).with_tool_executor(executor.clone());
    let output = runner.run(base_input("read a", &["fs.read"])).await.unwrap();

    assert_eq!(executor.call_count(), 1);
    assert_eq!(output.tool_calls.len(), 3);
    assert_eq!(output.tool_calls[0].result.output, output.tool_calls[2].result.output);
}

#[tokio::test]
async fn follow_through_guard_reprompts_then_apologizes() {
    let scripts: Vec<_> = (0..6)
        .map(|_| ModelResponse {
            final_text: "Let me check.".into(),
            ..Default::default()
        })
        .collect();
    let model = Arc::new(ScriptedModel::new(scripts));

    let runner = Runner::new(model.clone());
    let output = runner.run(base_input("list the files", &["fs.list"])).await.unwrap();

    assert_eq!(output.final_text, runloop_core_apology());
    let requests = model.requests.lock().unwrap();
    assert_eq!(requests.len(), 6);
    assert!(requests[5].messages.len() >= 5);
}

fn runloop_core_apology() -> &'static str {
    "I wasn't able to take concrete action on this request after repeated attempts. Could you clarify exactly what you'd like me to do, or provide any missing information?"
}

#[tokio::test]
async fn prompt_assembly_is_byte_identical_across_calls() {
    let docs = vec![
        ArtifactDoc::new("SOUL.md", "alpha"),
        ArtifactDoc::new("RULES.md", "beta"),
        ArtifactDoc::new("DEVPLAN.md", "gamma"),
    ];
    let expected = "## SOUL.md\nalpha\n\n## RULES.md\nbeta\n\n## DEVPLAN.md\ngamma\n";
    assert_eq!(runloop_core::assemble(&docs, 0), expected);
    assert_eq!(runloop_core::assemble(&docs, 0), runloop_core::assemble(&docs, 0));
}

#[tokio::test]
async fn missing_model_fails_fast() {
    let runner = Runner::without_model();
    let err = runner.run(base_input("hi", &[])).await.unwrap_err();
    assert!(matches!(err, RunError::ModelRequired));
}

#[tokio::test]
async fn tool_call_without_executor_fails() {
    let model = Arc::new(ScriptedModel::new(vec![ModelResponse {
        tool_calls: vec![tool_call("fs.read", "{}")],
        ..Default::default()
    }]));
    let runner = Runner::new(model);
    let err = runner.run(base_input("read it", &["fs.read"])).await.unwrap_err();
    assert!(matches!(err, RunError::ToolExecutorRequired));
}

#[tokio::test]
async fn callback_error_does_not_abort_later_dispatches() {
    let model = Arc::new(ScriptedModel::new(vec![
        ModelResponse {
            tool_calls: vec![tool_call("a.op", "{}"), tool_call("b.op", "{}")],
            ..Default::default()
        },
        ModelResponse {
            final_text: "done".into(),
            ..Default::default()
        },
    ]));
    let executor = Arc::new(EchoToolExecutor::default());
    let mut input = base_input("do two things", &["a.op", "b.op"]);
    input.on_tool_call = Some(Arc::new(|_record| Err(anyhow::anyhow!("sink unavailable"))));

    let runner = Runner::new(model).with_tool_executor(executor);
    let output = runner.run(input).await.unwrap();

    assert_eq!(output.tool_calls.len(), 2);
    assert_eq!(output.final_text, "done");
    assert!(output.tool_calls.iter().all(|r| r.callback_error.is_some()));
}

#[tokio::test]
async fn repeated_distinct_failures_eventually_escalate_to_user_guidance() {
    let model = Arc::new(ScriptedModel::new(vec![
        ModelResponse {
            tool_calls: vec![tool_call("flaky.op", "{\"try\":1}")],
            ..Default::default()
        },
        ModelResponse {
            tool_calls: vec![tool_call("flaky.op", "{\"try\":2}")],
            ..Default::default()
        },
        ModelResponse {
            tool_calls: vec![tool_call("flaky.op", "{\"try\":3}")],
            ..Default::default()
        },
        ModelResponse {
            tool_calls: vec![tool_call("flaky.op", "{\"try\":4}")],
            ..Default::default()
        },
        ModelResponse {
            tool_calls: vec![tool_call("flaky.op", "{\"try\":5}")],
            ..Default::default()
        },
    ]));
    let executor = Arc::new(AlwaysFailingToolExecutor("boom".into()));

    let runner = Runner::new(model).with_tool_executor(executor);
    let output = runner.run(base_input("do the flaky thing", &["flaky.op"])).await.unwrap();

    assert!(output.final_text.contains("repeated trouble"));
    assert!(output.final_text.contains("boom"));
}
