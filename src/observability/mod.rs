//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher and StubServer produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Test output (captured per test)
//!     → Any `metrics` recorder the harness installs
//! ```
//!
//! # Design Decisions
//! - Structured fields (method, uri, status, address) on every event
//! - Request ID set by the listener flows into logs and the journal

pub mod logging;
pub mod metrics;
