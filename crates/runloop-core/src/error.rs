// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
/// The three named boundary errors, plus a transparent wrapper for
/// anything else a collaborator surfaces.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("no model configured for this run")]
    ModelRequired,
    #[error("the model requested a tool call but no tool executor was configured")]
    ToolExecutorRequired,
    #[error("the iteration cap was reached before any tool call succeeded or failed")]
    ToolIterationCapExceeded,
    #[error("model request failed: {0}")]
    Model(String),
}
