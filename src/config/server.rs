//! Server configuration

use serde::{Deserialize, Serialize};

/// HTTP surface (health, readiness, metrics, inbound events)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for handling one inbound request, including routing
    pub request_timeout_seconds: u64,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_seconds: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}
