//! Circuit breaking for downstream collaborators.
//!
//! One breaker per logical service id, created lazily on first use and kept
//! in a sharded map so unrelated services never contend on a lock.

mod config;
mod error;
mod state;

#[cfg(test)]
mod tests;

pub use config::*;
pub use error::*;
pub use state::*;

use dashmap::DashMap;
use std::future::Future;
use tokio::time::Instant;

use crate::transport::TransportError;

pub const DATA_SERVICE: &str = "dataService";
pub const NOTIFICATION_SERVICE: &str = "notificationService";
pub const ANALYTICS_SERVICE: &str = "analyticsService";

/// Registry of per-service breakers.
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    settings: BreakerSettings,
    states: DashMap<String, BreakerState>,
}

impl CircuitBreakerRegistry {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            settings,
            states: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    /// Run `f` under the breaker for `service_id`.
    ///
    /// Fails fast with [`BreakerError::Open`] without calling `f` while the
    /// breaker is open or a half-open probe is already in flight. Only
    /// unavailability errors count as failures.
    pub async fn execute<T, F, Fut>(&self, service_id: &str, f: F) -> Result<T, BreakerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let config = self.settings.for_service(service_id);
        let permit = self.acquire(service_id, &config)?;

        let mut guard = ProbeGuard {
            registry: self,
            service_id,
            armed: permit == Permit::Probe,
        };
        let result = f().await;
        guard.armed = false;

        let outcome = match &result {
            Ok(_) => CallOutcome::Success,
            Err(e) if e.is_unavailability() => CallOutcome::Failure,
            Err(_) => CallOutcome::Neutral,
        };
        self.update(service_id, |state| {
            state.record(permit, outcome, &config, Instant::now())
        });

        result.map_err(BreakerError::Call)
    }

    /// Current state for `service_id`. Unknown services are closed.
    pub fn state_of(&self, service_id: &str) -> CircuitState {
        self.states
            .get(service_id)
            .map(|s| s.state)
            .unwrap_or_default()
    }

    pub fn is_open(&self, service_id: &str) -> bool {
        self.state_of(service_id) == CircuitState::Open
    }

    /// Snapshot of every known breaker, ordered by service id.
    pub fn snapshot(&self) -> Vec<BreakerSnapshot> {
        let mut snapshots: Vec<BreakerSnapshot> = self
            .states
            .iter()
            .map(|entry| entry.value().snapshot(entry.key()))
            .collect();
        snapshots.sort_by(|a, b| a.service_id.cmp(&b.service_id));
        snapshots
    }

    fn acquire(&self, service_id: &str, config: &BreakerConfig) -> Result<Permit, BreakerError> {
        let permit = self.update(service_id, |state| {
            state.try_acquire(config, Instant::now())
        });
        permit.ok_or_else(|| {
            tracing::debug!(service = service_id, "Circuit open, failing fast");
            BreakerError::Open {
                service: service_id.to_string(),
            }
        })
    }

    /// Mutate one breaker and report any state transition after the shard
    /// lock is released.
    fn update<R>(&self, service_id: &str, f: impl FnOnce(&mut BreakerState) -> R) -> R {
        let (before, after, result) = {
            let mut entry = self
                .states
                .entry(service_id.to_string())
                .or_insert_with(|| {
                    metrics::gauge!("leadrouter_breaker_state", "service" => service_id.to_string())
                        .set(CircuitState::Closed.gauge_value());
                    BreakerState::default()
                });
            let before = entry.state;
            let result = f(&mut *entry);
            (before, entry.state, result)
        };

        if before != after {
            self.on_transition(service_id, before, after);
        }
        result
    }

    fn on_transition(&self, service_id: &str, from: CircuitState, to: CircuitState) {
        metrics::gauge!("leadrouter_breaker_state", "service" => service_id.to_string())
            .set(to.gauge_value());

        match to {
            CircuitState::Open => tracing::warn!(
                service = service_id,
                from = %from,
                to = %to,
                "Circuit breaker opened"
            ),
            CircuitState::HalfOpen => tracing::info!(
                service = service_id,
                from = %from,
                to = %to,
                "Circuit breaker half-open, probing"
            ),
            CircuitState::Closed => tracing::info!(
                service = service_id,
                from = %from,
                to = %to,
                "Circuit breaker closed"
            ),
        }
    }
}

/// Releases a half-open probe if the call is dropped before completing.
struct ProbeGuard<'a> {
    registry: &'a CircuitBreakerRegistry,
    service_id: &'a str,
    armed: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Some(mut state) = self.registry.states.get_mut(self.service_id) {
                state.release_probe();
            }
        }
    }
}
