// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;

use crate::{CompletionRequest, ModelError, ModelResponse};

/// The text-generation backend the Run Loop drives.
///
/// Implementations are responsible for all protocol concerns: HTTP
/// transport, response-format parsing, and streaming `TextDelta` /
/// `ToolCall` events into `on_text_delta`. The core trusts the returned
/// [`ModelResponse`] verbatim and never re-parses model output.
///
/// Cancellation is applied externally: the orchestrator races `generate`
/// against the run's ambient cancellation signal with `tokio::select!`
/// rather than threading a cancellation token through this trait.
#[async_trait]
pub trait Model: Send + Sync {
    async fn generate(&self, request: CompletionRequest) -> Result<ModelResponse, ModelError>;
}
