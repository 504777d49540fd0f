// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{CompletionRequest, Model, ModelError, ModelResponse};

/// A pre-scripted [`Model`]. Each call to `generate` pops the next response
/// off the front of the queue, letting tests specify an exact sequence of
/// turns — including tool calls — without any network access.
///
/// Panics (via an `Err`) if more calls are made than scripts were provided,
/// which usually indicates the loop under test looped more than expected.
pub struct ScriptedModel {
    scripts: Mutex<Vec<ModelResponse>>,
    /// Every request this model has seen, in call order — lets tests assert
    /// on what the orchestrator actually sent (system prompt, tool results).
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new(scripts: Vec<ModelResponse>) -> Self {
        Self {
            scripts: Mutex::new(scripts),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Model for ScriptedModel {
    async fn generate(&self, request: CompletionRequest) -> Result<ModelResponse, ModelError> {
        if let Some(cb) = &request.on_text_delta {
            let pending_text = self
                .scripts
                .lock()
                .unwrap()
                .first()
                .map(|r| r.final_text.clone())
                .unwrap_or_default();
            if !pending_text.is_empty() {
                let _ = cb(&pending_text);
            }
        }
        self.requests.lock().unwrap().push(request);
        let mut scripts = self.scripts.lock().unwrap();
        if scripts.is_empty() {
            return Err(ModelError::Request(
                "ScriptedModel: no more scripted responses".into(),
            ));
        }
        Ok(scripts.remove(0))
    }
}

/// A model that always echoes the last user message back as the final
/// answer, never producing tool calls. Useful as a baseline in tests that
/// don't care about the model's content.
#[derive(Default)]
pub struct EchoModel;

#[async_trait]
impl Model for EchoModel {
    async fn generate(&self, request: CompletionRequest) -> Result<ModelResponse, ModelError> {
        Ok(ModelResponse {
            final_text: format!("echo: {}", request.user_message),
            ..Default::default()
        })
    }
}

/// A model that always fails, for testing the model-error recovery paths.
pub struct FailingModel(pub String);

#[async_trait]
impl Model for FailingModel {
    async fn generate(&self, _request: CompletionRequest) -> Result<ModelResponse, ModelError> {
        Err(ModelError::Request(self.0.clone()))
    }
}
