//! Configuration schema definitions.
//!
//! All types derive Serde traits so harnesses can embed the stub server
//! settings in their own fixture files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for one stub server instance.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind (e.g., "localhost", "127.0.0.1").
    pub host: String,

    /// Port to bind. `0` picks an ephemeral port.
    pub port: u16,

    /// Upper bound for the start and stop handshakes, in seconds.
    pub timeout_secs: u64,

    /// Free-form environment tag, only used in logs.
    pub environment: String,

    /// Replace the interrupt handler with one that terminates the process
    /// while the server runs.
    pub install_interrupt_handler: bool,

    /// Maximum request body the listener will buffer.
    pub max_body_bytes: usize,

    /// Default log level used by `observability::logging::init`.
    pub log_level: String,
}

impl ServerConfig {
    /// The handshake timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `host:port` as handed to the socket layer.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9000,
            timeout_secs: 5,
            environment: "none".to_string(),
            install_interrupt_handler: true,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 9000);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.environment, "none");
        assert_eq!(config.bind_address(), "localhost:9000");
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"port": 8123, "environment": "ci"}"#).unwrap();
        assert_eq!(config.port, 8123);
        assert_eq!(config.environment, "ci");
        assert_eq!(config.host, "localhost");
        assert!(config.install_interrupt_handler);
    }
}
