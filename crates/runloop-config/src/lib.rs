// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
mod loader;
mod logging;
mod schema;

pub use loader::load;
pub use logging::init_logging;
pub use schema::{Config, RunnerConfig};
