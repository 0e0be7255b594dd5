//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! ServerConfig (defaults or deserialized by the harness)
//!     → validation.rs (semantic checks, run by StubServer::start)
//!     → owned by StubServer, borrowed by Listener::bind
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - No file loading; the harness decides where settings come from

pub mod schema;
pub mod validation;

pub use schema::ServerConfig;
pub use validation::{validate_config, ValidationError};
