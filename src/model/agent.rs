//! Candidate agent snapshot.

use super::lead::{InsuranceType, Location};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A sales agent as returned by `agents.match`.
///
/// Snapshots are only valid for the routing attempt that fetched them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub specializations: BTreeSet<InsuranceType>,
    #[serde(default)]
    pub location: Location,
    /// Customer rating in 0..=5
    #[serde(default)]
    pub rating: f64,
    /// Historical conversion rate in 0..=1
    #[serde(default)]
    pub conversion_rate: f64,
    #[serde(default)]
    pub avg_response_time_secs: u64,
    #[serde(default)]
    pub current_lead_count: u32,
    #[serde(default)]
    pub max_lead_capacity: u32,
}

impl Agent {
    /// Create an agent with no load and neutral performance figures.
    pub fn new(id: impl Into<String>, location: Location, max_lead_capacity: u32) -> Self {
        Self {
            id: id.into(),
            name: None,
            specializations: BTreeSet::new(),
            location,
            rating: 0.0,
            conversion_rate: 0.0,
            avg_response_time_secs: 0,
            current_lead_count: 0,
            max_lead_capacity,
        }
    }

    /// True when the agent cannot take another lead.
    ///
    /// An agent with zero capacity is always at capacity.
    pub fn is_at_capacity(&self) -> bool {
        self.current_lead_count >= self.max_lead_capacity
    }

    pub fn specializes_in(&self, insurance_type: &InsuranceType) -> bool {
        self.specializations.contains(insurance_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_check_includes_boundary() {
        let mut agent = Agent::new("a1", Location::in_state("CA"), 5);
        agent.current_lead_count = 4;
        assert!(!agent.is_at_capacity());
        agent.current_lead_count = 5;
        assert!(agent.is_at_capacity());
        agent.current_lead_count = 9;
        assert!(agent.is_at_capacity());
    }

    #[test]
    fn zero_capacity_is_at_capacity() {
        let agent = Agent::new("a1", Location::default(), 0);
        assert!(agent.is_at_capacity());
    }

    #[test]
    fn agent_deserializes_camel_case() {
        let agent: Agent = serde_json::from_value(serde_json::json!({
            "id": "A",
            "specializations": ["auto", "home"],
            "location": { "state": "CA" },
            "rating": 4.5,
            "conversionRate": 0.3,
            "avgResponseTimeSecs": 120,
            "currentLeadCount": 2,
            "maxLeadCapacity": 10
        }))
        .unwrap();

        assert!(agent.specializes_in(&InsuranceType::Auto));
        assert_eq!(agent.avg_response_time_secs, 120);
        assert_eq!(agent.max_lead_capacity, 10);
    }
}
