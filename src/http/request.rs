//! Request metadata handed from the listener to the dispatcher.
//!
//! # Responsibilities
//! - Carry the parts of a request the dispatcher looks at (method, URI)
//! - Carry the raw metadata kept for diagnostics and the request journal
//!
//! # Design Decisions
//! - Plain owned strings; the dispatcher never sees hyper types
//! - Header names are stored lowercase, as hyper hands them over

use std::collections::BTreeMap;

use serde::Serialize;

/// Header carrying the request ID set by the listener.
pub const X_REQUEST_ID: &str = "x-request-id";

/// One incoming request, as seen by the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestMeta {
    pub method: String,
    pub uri: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl RequestMeta {
    /// A request with no headers and no body.
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// The request ID assigned by the listener, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.headers.get(X_REQUEST_ID).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_names_are_lowercased() {
        let req = RequestMeta::new("GET", "/").with_header("X-Request-Id", "abc");
        assert_eq!(req.request_id(), Some("abc"));
        assert!(req.headers.contains_key("x-request-id"));
    }
}
