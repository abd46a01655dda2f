//! Configuration for circuit breaking.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Thresholds for a single breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive counting failures before opening
    pub failure_threshold: u32,
    /// Milliseconds to stay open before admitting a probe
    pub cooldown_ms: u64,
    /// Successful probes required to close again
    pub success_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_ms: 30_000,
            success_threshold: 2,
        }
    }
}

impl BreakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Per-service override. Missing fields inherit the section defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerOverride {
    pub failure_threshold: Option<u32>,
    pub cooldown_ms: Option<u64>,
    pub success_threshold: Option<u32>,
}

/// `[breaker]` section: defaults plus `[breaker.services.<id>]` overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    #[serde(flatten)]
    pub defaults: BreakerConfig,
    pub services: HashMap<String, BreakerOverride>,
}

impl BreakerSettings {
    /// Effective thresholds for `service_id`.
    pub fn for_service(&self, service_id: &str) -> BreakerConfig {
        let base = self.defaults;
        match self.services.get(service_id) {
            Some(o) => BreakerConfig {
                failure_threshold: o.failure_threshold.unwrap_or(base.failure_threshold),
                cooldown_ms: o.cooldown_ms.unwrap_or(base.cooldown_ms),
                success_threshold: o.success_threshold.unwrap_or(base.success_threshold),
            },
            None => base,
        }
    }

    /// Every effective config, defaults first, for validation.
    pub fn all(&self) -> Vec<(String, BreakerConfig)> {
        let mut out = vec![("default".to_string(), self.defaults)];
        let mut ids: Vec<&String> = self.services.keys().collect();
        ids.sort();
        out.extend(ids.into_iter().map(|id| (id.clone(), self.for_service(id))));
        out
    }
}
