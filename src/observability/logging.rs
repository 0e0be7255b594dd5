//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for test binaries
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` wins over the configured level
//! - Safe to call from every test: later calls are ignored

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a fmt subscriber filtered at `level` unless `RUST_LOG` is set.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("stub_server={level},tower_http={level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init()
        .is_ok()
}
