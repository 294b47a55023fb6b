//! Structured logging initialization.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Derive the default filter from configuration
//! - Let RUST_LOG override the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// `log_level` comes from configuration and seeds the default filter for
/// this crate; the RUST_LOG environment variable wins when set.
pub fn init(log_level: &str) {
    let default_filter = format!("forward_proxy={}", log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
