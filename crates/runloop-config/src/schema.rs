// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

fn default_max_tool_iterations() -> u32 {
    25
}

fn default_tool_timeout_ms() -> u64 {
    900_000
}

/// The runner-level defaults the loop falls back to when a [`RunInput`]
/// does not override them.
///
/// [`RunInput`]: ../runloop_core/struct.RunInput.html
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Default cap on tool-dispatching iterations.
    /// Zero means "defer to the core's built-in default".
    #[serde(default = "default_max_tool_iterations")]
    pub default_max_tool_iterations: u32,
    /// Default per-tool-call timeout in milliseconds.
    #[serde(default = "default_tool_timeout_ms")]
    pub default_tool_timeout_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_max_tool_iterations: default_max_tool_iterations(),
            default_tool_timeout_ms: default_tool_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub runner: RunnerConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_positive_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.runner.default_max_tool_iterations, 25);
        assert_eq!(cfg.runner.default_tool_timeout_ms, 900_000);
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let cfg: Config = serde_yaml::from_str("runner:\n  default_tool_timeout_ms: 5000\n")
            .expect("valid yaml");
        assert_eq!(cfg.runner.default_tool_timeout_ms, 5000);
        assert_eq!(cfg.runner.default_max_tool_iterations, 25);
    }
}
