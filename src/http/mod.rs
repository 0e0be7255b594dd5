//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → request.rs (RequestMeta handed to the dispatcher)
//!     → [routing layer picks the stub]
//!     → response.rs (resolve stub body into a Reply)
//!     → server.rs (Reply written back to the client)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestMeta, X_REQUEST_ID};
pub use response::{BodySource, Payload, Reply, Response};
pub use server::HttpListener;
