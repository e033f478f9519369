//! Diagnostic tracing for the CLI.
//!
//! Worklists and reports go to stdout; tracing goes to stderr so the two
//! never mix when a worklist is piped into a file.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn`, or `labflow=debug` when `verbose`.
/// Calling it twice is harmless; the second call is ignored.
pub fn init(verbose: bool) {
    let fallback = if verbose { "labflow=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
