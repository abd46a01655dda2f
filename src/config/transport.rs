//! Message bus configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::transport::RetryPolicy;

/// Bus endpoint, timeouts and retry policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Base URL of the bus gateway
    pub bus_url: String,
    /// Timeout for data-service requests, spanning every retry attempt
    pub request_timeout_ms: u64,
    /// Timeout for notification and analytics publishes, retries included
    pub notification_timeout_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bus_url: "http://127.0.0.1:4222".to_string(),
            request_timeout_ms: 5_000,
            notification_timeout_ms: 5_000,
            retry: RetryPolicy::default(),
        }
    }
}

impl TransportConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_ms)
    }
}
