//! Logging setup for the binary

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize `tracing` output on stderr
///
/// If RUST_LOG is not set, a default is chosen: verbose in debug builds with
/// the HTTP stack quieted, INFO in release builds. Must run before any other
/// thread is started.
pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_err() {
        // Safety: single-threaded at startup
        unsafe {
            if cfg!(debug_assertions) {
                std::env::set_var("RUST_LOG", "debug,hyper_util=info,reqwest::connect=info");
            } else {
                std::env::set_var("RUST_LOG", "info");
            }
        }
    }

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env());
    if tracing_subscriber::registry().with(fmt_layer).try_init().is_err() {
        tracing::warn!("Logging was already initialized");
        return;
    }

    #[cfg(feature = "profiling")]
    tracing::info!("Logging initialized (profiling scopes emitted as tracing spans)");
    #[cfg(not(feature = "profiling"))]
    tracing::info!("Logging initialized");
}
