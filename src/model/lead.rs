//! Lead snapshot as supplied by the data service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Line of insurance a lead is shopping for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceType {
    Auto,
    Home,
    Life,
    Health,
    Renters,
    Commercial,
    /// Any line the router has no dedicated variant for
    #[serde(untagged)]
    Other(String),
}

impl FromStr for InsuranceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if normalized.is_empty() {
            return Err("insurance type cannot be empty".to_string());
        }
        Ok(match normalized.as_str() {
            "auto" => InsuranceType::Auto,
            "home" => InsuranceType::Home,
            "life" => InsuranceType::Life,
            "health" => InsuranceType::Health,
            "renters" => InsuranceType::Renters,
            "commercial" => InsuranceType::Commercial,
            _ => InsuranceType::Other(normalized),
        })
    }
}

impl fmt::Display for InsuranceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsuranceType::Auto => write!(f, "auto"),
            InsuranceType::Home => write!(f, "home"),
            InsuranceType::Life => write!(f, "life"),
            InsuranceType::Health => write!(f, "health"),
            InsuranceType::Renters => write!(f, "renters"),
            InsuranceType::Commercial => write!(f, "commercial"),
            InsuranceType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Routing status of a lead. Only the data service mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    Unrouted,
    PendingAck,
    Assigned,
    Escalated,
}

impl LeadStatus {
    /// Whether the orchestrator may (re-)enter this lead into routing.
    ///
    /// `PendingAck` is accepted so that redelivered events stay idempotent.
    pub fn is_routable(self) -> bool {
        matches!(self, LeadStatus::Unrouted | LeadStatus::PendingAck)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::Unrouted => "unrouted",
            LeadStatus::PendingAck => "pending_ack",
            LeadStatus::Assigned => "assigned",
            LeadStatus::Escalated => "escalated",
        }
    }
}

/// Sales priority flag set at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadPriority {
    High,
    #[default]
    Medium,
    Low,
}

/// Contact details. Carried through for notifications, never scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Postal location shared by leads and agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    /// Two-letter US state code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
}

impl Location {
    /// Location with only a state set.
    pub fn in_state(state: &str) -> Self {
        Self {
            state: Some(state.to_string()),
            ..Default::default()
        }
    }
}

/// A prospective customer waiting to be routed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub insurance_type: InsuranceType,
    #[serde(default)]
    pub contact: Contact,
    #[serde(default)]
    pub location: Location,
    /// Intake quality score in 0..=100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub priority: LeadPriority,
    #[serde(default)]
    pub status: LeadStatus,
    /// Agents currently holding a pending assignment for this lead
    #[serde(default)]
    pub pending_agent_ids: Vec<String>,
}

impl Lead {
    /// Create an unrouted lead with empty contact details.
    pub fn new(id: impl Into<String>, insurance_type: InsuranceType, location: Location) -> Self {
        Self {
            id: id.into(),
            insurance_type,
            contact: Contact::default(),
            location,
            quality_score: None,
            priority: LeadPriority::Medium,
            status: LeadStatus::Unrouted,
            pending_agent_ids: Vec::new(),
        }
    }
}
