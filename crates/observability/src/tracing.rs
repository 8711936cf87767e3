//! Tracing subscriber configuration.

use tracing_subscriber::EnvFilter;

/// Applied when `RUST_LOG` is unset or unparseable.
const DEFAULT_DIRECTIVES: &str = "info";

/// Initialize tracing for the process.
///
/// Emits JSON lines, filtered by `RUST_LOG` when present. Safe to call
/// multiple times; subsequent calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    install(filter);
}

/// Initialize tracing with explicit filter directives, ignoring the
/// environment. Meant for tests and one-off tooling.
pub fn init_with_filter(directives: &str) {
    install(EnvFilter::new(directives));
}

fn install(filter: EnvFilter) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
