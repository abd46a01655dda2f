//! Per-service breaker state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::config::BreakerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    #[default]
    Closed,
    HalfOpen,
    Open,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::HalfOpen => "half_open",
            CircuitState::Open => "open",
        }
    }

    /// Gauge encoding: 0 closed, 1 half-open, 2 open.
    pub fn gauge_value(&self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of admission granted to a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permit {
    Normal,
    Probe,
}

/// How a finished call is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    /// Unavailability or timeout
    Failure,
    /// Error that says nothing about the downstream's health
    Neutral,
}

/// Tracks breaker state for a single service.
#[derive(Debug, Clone, Default)]
pub struct BreakerState {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_probe_at: Option<DateTime<Utc>>,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

impl BreakerState {
    /// Try to admit a call. Moves `Open -> HalfOpen` once the cooldown has
    /// elapsed. `None` means fail fast.
    pub fn try_acquire(&mut self, config: &BreakerConfig, now: Instant) -> Option<Permit> {
        if self.state == CircuitState::Open {
            let cooled = self
                .opened_at
                .is_none_or(|opened| now.saturating_duration_since(opened) >= config.cooldown());
            if !cooled {
                return None;
            }
            self.state = CircuitState::HalfOpen;
            self.consecutive_successes = 0;
            self.probe_in_flight = false;
        }

        match self.state {
            CircuitState::Closed => Some(Permit::Normal),
            CircuitState::HalfOpen if self.probe_in_flight => None,
            CircuitState::HalfOpen => {
                self.probe_in_flight = true;
                self.last_probe_at = Some(Utc::now());
                Some(Permit::Probe)
            }
            CircuitState::Open => None,
        }
    }

    /// Apply the result of a call admitted with `permit`.
    ///
    /// Results from permits that no longer match the current state (a
    /// normal call finishing after the breaker opened) are ignored.
    pub fn record(
        &mut self,
        permit: Permit,
        outcome: CallOutcome,
        config: &BreakerConfig,
        now: Instant,
    ) {
        match permit {
            Permit::Probe => {
                self.probe_in_flight = false;
                if self.state != CircuitState::HalfOpen {
                    return;
                }
                match outcome {
                    CallOutcome::Success => {
                        self.consecutive_successes += 1;
                        if self.consecutive_successes >= config.success_threshold {
                            self.close();
                        }
                    }
                    CallOutcome::Failure => {
                        self.consecutive_failures += 1;
                        self.open(now);
                    }
                    CallOutcome::Neutral => {}
                }
            }
            Permit::Normal => {
                if self.state != CircuitState::Closed {
                    return;
                }
                match outcome {
                    CallOutcome::Success => self.consecutive_failures = 0,
                    CallOutcome::Failure => {
                        self.consecutive_failures += 1;
                        self.last_failure_at = Some(Utc::now());
                        if self.consecutive_failures >= config.failure_threshold {
                            self.open(now);
                        }
                    }
                    CallOutcome::Neutral => {}
                }
            }
        }
    }

    /// Give back a probe permit whose call never completed.
    pub fn release_probe(&mut self) {
        self.probe_in_flight = false;
    }

    pub fn snapshot(&self, service_id: &str) -> BreakerSnapshot {
        BreakerSnapshot {
            service_id: service_id.to_string(),
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            consecutive_successes: self.consecutive_successes,
            last_failure_at: self.last_failure_at,
            last_probe_at: self.last_probe_at,
        }
    }

    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
        self.consecutive_successes = 0;
        self.last_failure_at = Some(Utc::now());
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.opened_at = None;
        self.consecutive_failures = 0;
        self.consecutive_successes = 0;
    }
}

/// Point-in-time view of one breaker, for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerSnapshot {
    pub service_id: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_probe_at: Option<DateTime<Utc>>,
}
