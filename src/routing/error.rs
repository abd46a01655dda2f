//! Error types for routing failures

use thiserror::Error;

use crate::breaker::BreakerError;
use crate::transport::TransportError;

/// Terminal failure of one routing step. Every variant carries the lead id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// A downstream call failed with a network error or timed out
    #[error("lead '{lead_id}': {service} unavailable: {message}")]
    DownstreamUnavailable {
        lead_id: String,
        service: String,
        message: String,
    },

    /// Bad or missing lead, or nothing to rank
    #[error("lead '{lead_id}': {message}")]
    Validation { lead_id: String, message: String },

    /// Candidates exist but none can take the lead
    #[error("lead '{lead_id}': no eligible candidates")]
    NoEligibleCandidates { lead_id: String },

    /// The assignment already existed
    #[error("lead '{lead_id}' already assigned to agent '{agent_id}'")]
    AssignmentConflict { lead_id: String, agent_id: String },

    /// The breaker short-circuited the call
    #[error("lead '{lead_id}': circuit open for {service}")]
    BreakerOpen { lead_id: String, service: String },
}

impl RoutingError {
    /// Stable taxonomy code.
    pub fn code(&self) -> &'static str {
        match self {
            RoutingError::DownstreamUnavailable { .. } => "downstream_unavailable",
            RoutingError::Validation { .. } => "validation_error",
            RoutingError::NoEligibleCandidates { .. } => "no_eligible_candidates",
            RoutingError::AssignmentConflict { .. } => "assignment_conflict",
            RoutingError::BreakerOpen { .. } => "breaker_open",
        }
    }

    pub fn lead_id(&self) -> &str {
        match self {
            RoutingError::DownstreamUnavailable { lead_id, .. }
            | RoutingError::Validation { lead_id, .. }
            | RoutingError::NoEligibleCandidates { lead_id }
            | RoutingError::AssignmentConflict { lead_id, .. }
            | RoutingError::BreakerOpen { lead_id, .. } => lead_id,
        }
    }

    /// Whether a later redelivery might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RoutingError::DownstreamUnavailable { .. } | RoutingError::BreakerOpen { .. }
        )
    }

    pub fn validation(lead_id: &str, message: impl Into<String>) -> Self {
        RoutingError::Validation {
            lead_id: lead_id.to_string(),
            message: message.into(),
        }
    }

    /// Classify a breaker-wrapped call that failed while routing `lead_id`.
    pub fn from_breaker(lead_id: &str, service: &str, err: BreakerError) -> Self {
        match err {
            BreakerError::Open { service } => RoutingError::BreakerOpen {
                lead_id: lead_id.to_string(),
                service,
            },
            BreakerError::Call(e) if e.is_unavailability() => {
                RoutingError::DownstreamUnavailable {
                    lead_id: lead_id.to_string(),
                    service: service.to_string(),
                    message: e.to_string(),
                }
            }
            BreakerError::Call(e @ TransportError::Rejected { .. })
            | BreakerError::Call(e @ TransportError::InvalidPayload { .. })
            | BreakerError::Call(e @ TransportError::AlreadySubscribed { .. }) => {
                RoutingError::validation(lead_id, e.to_string())
            }
            BreakerError::Call(e) => RoutingError::DownstreamUnavailable {
                lead_id: lead_id.to_string(),
                service: service.to_string(),
                message: e.to_string(),
            },
        }
    }
}
