// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
//! Loop guards: iteration cap, no-progress counter, and the Follow-Through
//! Guard's deferral/rejection phrase lists.

pub const BUILT_IN_DEFAULT_MAX_ITERATIONS: u32 = 25;
pub const NO_PROGRESS_THRESHOLD: u32 = 6;
pub const FOLLOW_THROUGH_REPROMPT_CAP: u32 = 5;
pub const FOLLOW_THROUGH_MAX_CHARS: usize = 480;

const DEFERRAL_PREFIXES: &[&str] = &[
    "let me",
    "i'll",
    "i will",
    "give me a moment",
    "give me a second",
    "hold on",
    "one moment",
    "one sec",
    "working on it",
    "sure, let me",
];

const REJECTION_MARKERS: &[&str] = &[
    "can't",
    "cannot",
    "unable",
    "permission",
    "missing",
    "blocked",
];

/// First positive value wins: per-run override, then runner default, then
/// the built-in fallback.
pub fn effective_cap(override_cap: Option<u32>, runner_default: u32) -> u32 {
    if let Some(c) = override_cap {
        if c > 0 {
            return c;
        }
    }
    if runner_default > 0 {
        return runner_default;
    }
    BUILT_IN_DEFAULT_MAX_ITERATIONS
}

/// True when `text` reads like the model deferring action rather than
/// taking it or giving a real final answer.
pub fn is_follow_through_deferral(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().count() > FOLLOW_THROUGH_MAX_CHARS {
        return false;
    }
    let lower = trimmed.to_lowercase();
    if REJECTION_MARKERS.iter().any(|m| lower.contains(m)) {
        return false;
    }
    DEFERRAL_PREFIXES.iter().any(|p| lower.starts_with(p))
}
