//! Logging and tracing initialization.
//!
//! Library code logs through both `log` macros and `tracing` spans;
//! [`init`] routes everything into one formatted subscriber, filtered
//! by `RUST_LOG` when set.

use tracing::subscriber::set_global_default;
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Installs the global subscriber. Safe to call more than once; later
/// calls are no-ops.
pub fn init(default_filter: &str) {
    if LogTracer::init().is_err() {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.to_string()));
    let subscriber = Registry::default().with(filter).with(fmt::layer());
    if set_global_default(subscriber).is_err() {
        log::debug!("Tracing subscriber was already set");
    }
}
