//! Error types shared by every subsystem.
//!
//! # Design Decisions
//! - One enum for the whole crate; every failure is reported to the call
//!   that triggered it, nothing is retried
//! - Underlying listener failures keep their cause as `source`

use std::time::Duration;

use crate::config::validation::ValidationError;

/// Convenience alias used throughout the crate.
pub type Result<T, E = StubError> = std::result::Result<T, E>;

/// Everything that can go wrong while registering stubs, dispatching
/// requests or driving the server lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum StubError {
    /// `start` was called while the server is already started.
    #[error("stub server is already started")]
    AlreadyStarted,

    /// The listener did not confirm startup in time.
    #[error("stub server did not confirm startup within {0:?}")]
    StartTimeout(Duration),

    /// The listener reported a stop before it ever reported a start.
    #[error("stub server stopped before it finished starting")]
    StoppedBeforeStart,

    /// Binding the listening socket failed (port in use, bad host, ...).
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The accept loop failed.
    #[error("listener failed: {0}")]
    Listener(#[from] std::io::Error),

    /// The accept loop panicked.
    #[error("listener panicked: {0}")]
    ListenerPanicked(String),

    /// Only GET, PUT, POST and DELETE routes can be registered.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// A request URI or a registered path could not be parsed.
    #[error("malformed URI {uri:?}: {source}")]
    MalformedUri {
        uri: String,
        #[source]
        source: axum::http::uri::InvalidUri,
    },

    /// A path pattern failed to compile.
    #[error("invalid path pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A response has neither fixed data nor a producer.
    #[error("response has no body source")]
    ResponseBodyMissing,

    /// The configuration failed semantic validation.
    #[error("invalid configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ValidationError>),

    /// The not-found snapshot could not be serialized.
    #[error("failed to serialize response body: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_listed() {
        let err = StubError::InvalidConfig(vec![
            ValidationError::EmptyHost,
            ValidationError::ZeroTimeout,
        ]);
        let text = err.to_string();
        assert!(text.contains("host"));
        assert!(text.contains("timeout"));
    }
}
