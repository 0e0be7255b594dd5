//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (method, URI)
//!     → router.rs (route lookup in registration order)
//!     → matcher.rs (path extraction, literal or pattern match)
//!     → Return: matched Route or NotFound snapshot
//!
//! Registration (between tests):
//!     get/put/post/delete → copy-on-write swap of the route table
//! ```
//!
//! # Design Decisions
//! - Deterministic: same table and request always give the same result
//! - First match wins (registration order)
//! - Only GET, PUT, POST and DELETE can be registered

pub mod matcher;
pub mod router;

pub use matcher::{Method, PathSpec};
pub use router::{Dispatcher, Lookup, NotFound, Route, RouteTable};
