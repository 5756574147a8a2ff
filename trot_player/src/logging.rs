//! Tracing setup.

use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` when set and valid, otherwise `level`.
pub fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber, writing to stderr. Calling it a second
/// time is harmless; the first subscriber stays.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
