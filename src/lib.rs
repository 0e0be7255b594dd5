//! Programmable HTTP stub server for tests.
//!
//! Register canned responses on a [`Dispatcher`], start a [`StubServer`],
//! point the client under test at it, then stop it and clear the stubs.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::ServerConfig;
pub use error::{Result, StubError};
pub use http::{Payload, Reply, RequestMeta, Response};
pub use lifecycle::{State, StubServer};
pub use net::{Hooks, Listener};
pub use routing::{Dispatcher, Method, PathSpec};
