//! Ranking and routing decision types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Per-factor sub-scores for one (lead, agent) pair, each in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RoutingFactors {
    pub specialization: f64,
    pub location: f64,
    pub performance: f64,
    pub workload: f64,
    pub quality_tier: f64,
}

/// One entry of a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedAgent {
    pub agent_id: String,
    /// Weighted score in 0..=100
    pub score: f64,
    /// `score / 100`
    pub confidence: f64,
    pub factors: RoutingFactors,
    /// False when the agent is at or over capacity
    pub eligible: bool,
}

impl RankedAgent {
    /// Ranking order: score descending, then agent id ascending.
    pub fn ranking_order(a: &RankedAgent, b: &RankedAgent) -> Ordering {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.agent_id.cmp(&b.agent_id))
    }
}

/// A selected agent whose assignment could not be committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedAssignment {
    pub agent_id: String,
    pub code: String,
    pub message: String,
}

/// Outcome of one routing attempt, emitted on `analytics.routing_decision`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    pub decision_id: String,
    pub lead_id: String,
    /// Committed assignments, in ranking order
    pub assignments: Vec<RankedAgent>,
    #[serde(default)]
    pub failed: Vec<FailedAssignment>,
    /// Set when no candidate cleared the confidence threshold
    pub below_threshold: bool,
    /// Set when the lead was handed to manual review instead of an agent
    #[serde(default)]
    pub escalated: bool,
    pub candidates_considered: usize,
    pub decided_at: DateTime<Utc>,
}

impl RoutingDecision {
    pub fn new(lead_id: impl Into<String>, candidates_considered: usize) -> Self {
        Self {
            decision_id: uuid::Uuid::new_v4().to_string(),
            lead_id: lead_id.into(),
            assignments: Vec::new(),
            failed: Vec::new(),
            below_threshold: false,
            escalated: false,
            candidates_considered,
            decided_at: Utc::now(),
        }
    }

    pub fn assigned_agent_ids(&self) -> Vec<&str> {
        self.assignments.iter().map(|a| a.agent_id.as_str()).collect()
    }

    /// True when some but not all selected agents were committed.
    pub fn is_partial(&self) -> bool {
        !self.assignments.is_empty() && !self.failed.is_empty()
    }
}
