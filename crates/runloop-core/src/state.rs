// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::{HashMap, HashSet};

use runloop_model::{ChatMessage, ToolCallResult};

use crate::data::ToolCallRecord;

pub const RECOVERY_ENTRY_THRESHOLD: u32 = 2;
pub const RECOVERY_EXIT_THRESHOLD: u32 = 3;
pub const GUIDANCE_FAILURE_THRESHOLD: u32 = 3;

/// Tracks tool outcomes across iterations and decides when the prompt
/// should switch into recovery mode or escalate to the user.
#[derive(Debug, Default)]
pub struct FailureState {
    pub recovery_active: bool,
    consecutive_failures: u32,
    failures_since_recovery: u32,
    successes_since_recovery: u32,
}

impl FailureState {
    pub fn on_success(&mut self) {
        if self.recovery_active {
            self.successes_since_recovery += 1;
            if self.successes_since_recovery >= RECOVERY_EXIT_THRESHOLD {
                self.recovery_active = false;
                self.failures_since_recovery = 0;
                self.successes_since_recovery = 0;
            }
        } else {
            self.consecutive_failures = 0;
        }
    }

    pub fn on_failure(&mut self) {
        if self.recovery_active {
            self.failures_since_recovery += 1;
        } else {
            self.consecutive_failures += 1;
            if self.consecutive_failures >= RECOVERY_ENTRY_THRESHOLD {
                self.recovery_active = true;
                self.failures_since_recovery = 0;
                self.successes_since_recovery = 0;
            }
        }
    }

    pub fn should_escalate_to_guidance(&self) -> bool {
        self.recovery_active && self.failures_since_recovery >= GUIDANCE_FAILURE_THRESHOLD
    }
}

#[derive(Default)]
struct FailureCounter {
    last_error: String,
    last_output: String,
    count: u32,
}

/// Mutable bookkeeping for one run. Created at the start of `run()`,
/// dropped at the end; nothing here survives across runs.
#[derive(Default)]
pub struct RunState {
    pub history: Vec<ChatMessage>,
    pub tool_results: Vec<ToolCallResult>,
    pub tool_call_records: Vec<ToolCallRecord>,
    pub failure_state: FailureState,
    pub no_progress_counter: u32,
    pub follow_through_reprompts: u32,
    pub tool_iterations: u32,
    pub latest_reasoning: Option<String>,
    pub reasoning_present: bool,
    pub tool_parse_failure: bool,

    used_tool_call_ids: HashSet<String>,
    next_ordinal: u32,
    success_cache: HashMap<String, String>,
    failed_cache: HashMap<String, (String, String)>,
    failure_counts: HashMap<String, FailureCounter>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synthesize a name if the model left it empty, then
    /// dedupe against every ID already used this run.
    pub fn assign_unique_id(&mut self, raw_id: &str) -> String {
        let base = if raw_id.is_empty() {
            self.next_ordinal += 1;
            format!("tool-call-{}", self.next_ordinal)
        } else {
            raw_id.to_string()
        };

        if self.used_tool_call_ids.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}-{n}");
            if self.used_tool_call_ids.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    /// `None` when both `name` and `arguments` are empty — such calls are
    /// never cached.
    pub fn fingerprint(name: &str, arguments: &str) -> Option<String> {
        if name.is_empty() && arguments.is_empty() {
            return None;
        }
        Some(format!("{name}|{arguments}"))
    }

    pub fn success_cache_get(&self, fingerprint: &str) -> Option<String> {
        self.success_cache.get(fingerprint).cloned()
    }

    pub fn failed_cache_get(&self, fingerprint: &str) -> Option<(String, String)> {
        self.failed_cache.get(fingerprint).cloned()
    }

    pub fn record_success(&mut self, fingerprint: &str, output: &str) {
        self.success_cache
            .insert(fingerprint.to_string(), output.to_string());
        self.failure_counts.remove(fingerprint);
    }

    /// Returns `true` the moment this fingerprint's failure is promoted
    /// into the failed-repeat cache (second identical failure).
    pub fn record_failure(&mut self, fingerprint: &str, output: &str, error: &str) -> bool {
        let error = error.trim();
        let entry = self
            .failure_counts
            .entry(fingerprint.to_string())
            .or_default();
        if entry.last_error == error {
            entry.count += 1;
        } else {
            entry.last_error = error.to_string();
            entry.count = 1;
        }
        entry.last_output = output.to_string();

        if entry.count >= 2 {
            self.failed_cache.insert(
                fingerprint.to_string(),
                (entry.last_output.clone(), entry.last_error.clone()),
            );
            true
        } else {
            false
        }
    }
}
