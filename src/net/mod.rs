//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! StubServer::start
//!     → Listener::bind (socket bound on the caller's task)
//!     → Listener::serve (background task, accept loop)
//!         → hooks.started() / hooks.stopped()
//!         → Dispatcher::dispatch per request
//! ```
//!
//! # Design Decisions
//! - The listener is a trait so tests can substitute misbehaving listeners
//! - The default implementation lives in `http::server`

pub mod listener;

pub use listener::{Hooks, Listener};
