// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use args::TracingArg;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, prelude::*};

/// The filter for `--tracing`, on top of `RUST_LOG`. Defaults to `info`.
pub(crate) fn env_filter(tracing: Option<&TracingArg>) -> Result<EnvFilter, String> {
    let default = tracing
        .and_then(TracingArg::default_level)
        .unwrap_or(LevelFilter::INFO);
    let mut filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();
    for directive in tracing.into_iter().flat_map(TracingArg::target_directives) {
        let parsed = directive
            .parse()
            .map_err(|e| format!("Invalid tracing directive {directive}: {e}"))?;
        filter = filter.add_directive(parsed);
    }
    Ok(filter)
}

pub(crate) fn init_logging(tracing: Option<&TracingArg>) -> Result<(), String> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter(tracing)?)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| format!("Failed to initialize tracing subscriber: {e}"))
}
