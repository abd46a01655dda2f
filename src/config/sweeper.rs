//! Stale-lead sweeper configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `[sweeper]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweeperConfig {
    pub enabled: bool,
    /// Seconds between sweeps
    pub interval_seconds: u64,
    /// Age after which an unacknowledged assignment is stale
    pub escalation_timeout_ms: u64,
    /// Re-routes allowed before a lead is escalated
    pub max_reassignments: u32,
    /// Stale assignments fetched per sweep
    pub batch_size: usize,
    /// Leads processed in parallel
    pub concurrency: usize,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 60,
            escalation_timeout_ms: 15 * 60 * 1000,
            max_reassignments: 2,
            batch_size: 100,
            concurrency: 4,
        }
    }
}

impl SweeperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn escalation_timeout(&self) -> Duration {
        Duration::from_millis(self.escalation_timeout_ms)
    }
}
