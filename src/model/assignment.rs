//! Assignment records owned by the data service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a single lead → agent assignment.
///
/// Transitions only move forward: `Pending → Acknowledged` or `Pending → Expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    #[default]
    Pending,
    Acknowledged,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub lead_id: String,
    pub agent_id: String,
    pub assigned_at: DateTime<Utc>,
    #[serde(default)]
    pub status: AssignmentStatus,
}

/// A pending assignment older than the escalation timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleAssignment {
    pub lead_id: String,
    pub agent_id: String,
    pub assigned_at: DateTime<Utc>,
    /// How many times this lead has already been re-routed
    #[serde(default)]
    pub reassignment_count: u32,
    /// Agents that let earlier assignments of this lead expire
    #[serde(default)]
    pub previous_agent_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_status_defaults_to_pending() {
        let assignment: Assignment = serde_json::from_str(
            r#"{"leadId":"L1","agentId":"A","assignedAt":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Pending);

        let json = serde_json::to_value(AssignmentStatus::Acknowledged).unwrap();
        assert_eq!(json, "acknowledged");
    }
}
