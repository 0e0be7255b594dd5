//! Route matching logic.
//!
//! # Responsibilities
//! - Parse the supported HTTP methods
//! - Extract the path component of a request URI
//! - Match a path against a literal or a regex
//!
//! # Design Decisions
//! - Literal paths match by equality, patterns by regex search
//! - Query string and fragment never take part in matching
//! - Path matching is case-sensitive

use std::fmt;
use std::str::FromStr;

use axum::http::Uri;
use regex::Regex;

use crate::error::{Result, StubError};

/// The HTTP methods routes can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    pub const ALL: [Method; 4] = [Method::Get, Method::Put, Method::Post, Method::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl FromStr for Method {
    type Err = StubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "PUT" => Ok(Method::Put),
            "POST" => Ok(Method::Post),
            "DELETE" => Ok(Method::Delete),
            _ => Err(StubError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a request URI (absolute or origin-form) and return its path.
pub fn request_path(uri: &str) -> Result<String> {
    let parsed: Uri = uri.parse().map_err(|source| StubError::MalformedUri {
        uri: uri.to_string(),
        source,
    })?;
    Ok(parsed.path().to_string())
}

/// What a route's path must look like.
#[derive(Debug, Clone)]
pub enum PathSpec {
    /// The path must equal this string.
    Exact(String),
    /// The pattern must match somewhere in the path.
    Pattern(Regex),
}

impl PathSpec {
    /// Compile a regex path spec.
    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(PathSpec::Pattern(Regex::new(pattern)?))
    }

    /// Test an already extracted path.
    pub fn matches_path(&self, path: &str) -> bool {
        match self {
            PathSpec::Exact(expected) => expected == path,
            PathSpec::Pattern(regex) => regex.is_match(path),
        }
    }
}

impl From<&str> for PathSpec {
    fn from(path: &str) -> Self {
        PathSpec::Exact(path.to_string())
    }
}

impl From<String> for PathSpec {
    fn from(path: String) -> Self {
        PathSpec::Exact(path)
    }
}

impl From<Regex> for PathSpec {
    fn from(regex: Regex) -> Self {
        PathSpec::Pattern(regex)
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSpec::Exact(path) => f.write_str(path),
            PathSpec::Pattern(regex) => write!(f, "~{}", regex.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);

        let err = "PATCH".parse::<Method>().unwrap_err();
        assert!(matches!(err, StubError::UnsupportedMethod(m) if m == "PATCH"));
    }

    #[test]
    fn test_request_path_strips_query_and_fragment() {
        assert_eq!(request_path("/widgets/1?verbose=true").unwrap(), "/widgets/1");
        assert_eq!(
            request_path("http://localhost:9000/widgets/1?x=1").unwrap(),
            "/widgets/1"
        );
        assert_eq!(request_path("/").unwrap(), "/");
    }

    #[test]
    fn test_malformed_uri() {
        let err = request_path("/has space").unwrap_err();
        assert!(matches!(err, StubError::MalformedUri { ref uri, .. } if uri == "/has space"));
    }

    #[test]
    fn test_exact_match() {
        let spec = PathSpec::from("/api");
        assert!(spec.matches_path("/api"));
        assert!(!spec.matches_path("/api/v1"));
        assert!(!spec.matches_path("/API"));
    }

    #[test]
    fn test_pattern_match() {
        let spec = PathSpec::pattern(r"^/widgets/\d+$").unwrap();
        assert!(spec.matches_path("/widgets/42"));
        assert!(!spec.matches_path("/widgets/abc"));

        // Unanchored patterns match anywhere in the path.
        let spec = PathSpec::pattern("orders").unwrap();
        assert!(spec.matches_path("/v2/orders/7"));

        assert!(matches!(
            PathSpec::pattern("(").unwrap_err(),
            StubError::InvalidPattern(_)
        ));
    }
}
