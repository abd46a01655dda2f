//! Routing configuration

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What to do when no candidate clears the confidence threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BelowThresholdPolicy {
    /// Assign the single best eligible candidate anyway
    #[default]
    FallbackBest,
    /// Hand the lead to manual review
    Escalate,
}

impl BelowThresholdPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BelowThresholdPolicy::FallbackBest => "fallback_best",
            BelowThresholdPolicy::Escalate => "escalate",
        }
    }
}

impl FromStr for BelowThresholdPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fallback_best" | "fallback" => Ok(BelowThresholdPolicy::FallbackBest),
            "escalate" => Ok(BelowThresholdPolicy::Escalate),
            _ => Err(format!(
                "Invalid below-threshold policy: {}. Expected 'fallback_best' or 'escalate'",
                s
            )),
        }
    }
}

/// Orchestrator tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Minimum `score / 100` an agent needs to be selected
    pub min_confidence_threshold: f64,
    /// Upper bound on concurrently pending assignments per lead
    pub max_agents_per_lead: usize,
    /// How many candidates to request from the data service
    pub candidate_pool_size: usize,
    pub below_threshold_policy: BelowThresholdPolicy,
    /// Rolling window for per-agent routing history
    pub history_window_hours: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            min_confidence_threshold: 0.7,
            max_agents_per_lead: 3,
            candidate_pool_size: 10,
            below_threshold_policy: BelowThresholdPolicy::FallbackBest,
            history_window_hours: 24,
        }
    }
}
