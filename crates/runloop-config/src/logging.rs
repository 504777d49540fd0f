// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Install a `tracing` subscriber writing to stderr.
///
/// `verbosity` follows the conventional `-v`/`-vv` count: `0` → warn,
/// `1` → debug, `>=2` → trace. `RUST_LOG` always takes precedence when set.
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
