//! Tracing subscriber setup for the exporter binary.

use tracing_subscriber::EnvFilter;

/// Log level used when neither `RUST_LOG` nor `LOGLEVEL` is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Installs the global `fmt` subscriber.
///
/// `RUST_LOG` wins when present; otherwise `LOGLEVEL` (case-insensitive,
/// e.g. `DEBUG`) sets the level for every target.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(default_directive(std::env::var("LOGLEVEL").ok()))
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn default_directive(level: Option<String>) -> String {
    level
        .map(|level| level.trim().to_lowercase())
        .filter(|level| !level.is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}
