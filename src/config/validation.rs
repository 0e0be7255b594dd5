//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, non-empty host)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before the listener is bound

use std::fmt;

use crate::config::schema::ServerConfig;

/// A single semantic problem with a `ServerConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyHost,
    ZeroTimeout,
    ZeroBodyLimit,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyHost => write!(f, "host must not be empty"),
            ValidationError::ZeroTimeout => write!(f, "timeout_secs must be greater than zero"),
            ValidationError::ZeroBodyLimit => write!(f, "max_body_bytes must be greater than zero"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
