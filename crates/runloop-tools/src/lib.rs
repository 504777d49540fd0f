// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
mod executor;
pub mod mock;

pub use executor::{ToolExecError, ToolExecutor};

// Re-exported for convenience so downstream crates can refer to the call
// and result types through `runloop_tools` without an extra dependency on
// `runloop-model` for this narrow purpose.
pub use runloop_model::{ToolCallRequest, ToolCallResult};
