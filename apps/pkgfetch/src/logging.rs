//! Tracing setup and event logging

use pkgfetch_events::FetchEvent;
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,pkgfetch=info";
const DEBUG_FILTER: &str = "info,pkgfetch=debug";

/// Install the global tracing subscriber
///
/// Logs go to stderr so stdout carries only results. `RUST_LOG` takes
/// precedence over `--debug`.
pub fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let fallback = if debug_enabled {
        DEBUG_FILTER
    } else {
        DEFAULT_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    if json_mode {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(debug_enabled)
            .with_env_filter(filter)
            .init();
    }
}

/// Log a fetch event at its own level
pub fn log_event(event: &FetchEvent) {
    let part = event.part().unwrap_or("-");
    match event.log_level() {
        tracing::Level::ERROR => error!(target: "pkgfetch::events", part, event = ?event, "fetch event"),
        tracing::Level::WARN => warn!(target: "pkgfetch::events", part, event = ?event, "fetch event"),
        tracing::Level::INFO => info!(target: "pkgfetch::events", part, event = ?event, "fetch event"),
        tracing::Level::DEBUG => debug!(target: "pkgfetch::events", part, event = ?event, "fetch event"),
        tracing::Level::TRACE => trace!(target: "pkgfetch::events", part, event = ?event, "fetch event"),
    }
}
