//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! start (manager.rs):
//!     Validate config → Listener::bind → save interrupt handler (signals.rs)
//!     → spawn serve task → wait for Started (startup.rs)
//!
//! stop (manager.rs):
//!     Restore interrupt handler → trigger Shutdown (shutdown.rs)
//!     → wait for Stopped → join task, abort on timeout
//! ```
//!
//! # Design Decisions
//! - Every wait is bounded by a timeout
//! - Startup failures surface on the `start` call, not on the background task
//! - Teardown always returns control, even when the task has to be aborted

pub mod manager;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use manager::{State, StubServer};
pub use shutdown::Shutdown;
