//! Diagnostic logging
//!
//! Events go to stderr, filtered by `TLDR_MAN_LOG` (an `EnvFilter`
//! directive, default `warn`). User-facing messages do not go through here.

use std::io;

use tracing_subscriber::EnvFilter;

/// Variable holding the log filter directive.
pub const LOG_ENV_VAR: &str = "TLDR_MAN_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
