//! Typed, breaker-wrapped access to downstream collaborators.

use std::sync::Arc;
use std::time::Duration;

use crate::breaker::{
    BreakerError, CircuitBreakerRegistry, ANALYTICS_SERVICE, DATA_SERVICE, NOTIFICATION_SERVICE,
};
use crate::model::{Agent, Assignment, Lead, RankedAgent, RoutingDecision, StaleAssignment};
use crate::transport::topics::{
    self, AgentNotification, AssignLead, EscalateLead, ExpireAssignment, GetLead, MatchAgents,
    NeedsRouting, RoutingDecisionEvent, StaleAssignments,
};
use crate::transport::{MessageBus, TransportError};

use super::RoutingError;

/// Rejection codes the data service uses for an existing assignment.
const CONFLICT_CODES: &[&str] = &["conflict", "assignment_conflict", "already_assigned"];

/// Request/reply client for the data service.
#[derive(Clone)]
pub struct DataServiceClient {
    bus: Arc<dyn MessageBus>,
    breakers: Arc<CircuitBreakerRegistry>,
    timeout: Duration,
}

impl DataServiceClient {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        breakers: Arc<CircuitBreakerRegistry>,
        timeout: Duration,
    ) -> Self {
        Self {
            bus,
            breakers,
            timeout,
        }
    }

    pub async fn get_lead(&self, lead_id: &str) -> Result<Lead, RoutingError> {
        let request = GetLead {
            lead_id: lead_id.to_string(),
        };
        let reply = self
            .call(&request)
            .await
            .map_err(|e| RoutingError::from_breaker(lead_id, DATA_SERVICE, e))?;
        if reply.lead.id != lead_id {
            return Err(RoutingError::validation(
                lead_id,
                format!("data service returned lead '{}'", reply.lead.id),
            ));
        }
        Ok(reply.lead)
    }

    pub async fn match_agents(
        &self,
        lead: &Lead,
        limit: usize,
        exclude_agent_ids: Vec<String>,
    ) -> Result<Vec<Agent>, RoutingError> {
        let request = MatchAgents {
            lead_id: lead.id.clone(),
            insurance_type: lead.insurance_type.clone(),
            location: lead.location.clone(),
            limit,
            exclude_agent_ids,
        };
        self.call(&request)
            .await
            .map(|reply| reply.agents)
            .map_err(|e| RoutingError::from_breaker(&lead.id, DATA_SERVICE, e))
    }

    /// Commit an assignment. An already existing one surfaces as
    /// [`RoutingError::AssignmentConflict`].
    pub async fn assign(&self, lead_id: &str, agent_id: &str) -> Result<Assignment, RoutingError> {
        let request = AssignLead {
            lead_id: lead_id.to_string(),
            agent_id: agent_id.to_string(),
        };
        let conflict = || RoutingError::AssignmentConflict {
            lead_id: lead_id.to_string(),
            agent_id: agent_id.to_string(),
        };

        match self.call(&request).await {
            Ok(reply) if reply.created => Ok(reply.assignment),
            Ok(_) => Err(conflict()),
            Err(BreakerError::Call(TransportError::Rejected { code, .. }))
                if CONFLICT_CODES.contains(&code.as_str()) =>
            {
                Err(conflict())
            }
            Err(e) => Err(RoutingError::from_breaker(lead_id, DATA_SERVICE, e)),
        }
    }

    pub async fn escalate_lead(&self, lead_id: &str, reason: &str) -> Result<Lead, RoutingError> {
        let request = EscalateLead {
            lead_id: lead_id.to_string(),
            reason: reason.to_string(),
        };
        self.call(&request)
            .await
            .map(|reply| reply.lead)
            .map_err(|e| RoutingError::from_breaker(lead_id, DATA_SERVICE, e))
    }

    pub async fn stale_assignments(
        &self,
        older_than: Duration,
        limit: usize,
    ) -> Result<Vec<StaleAssignment>, BreakerError> {
        let request = StaleAssignments {
            older_than_ms: older_than.as_millis() as u64,
            limit,
        };
        self.call(&request).await.map(|reply| reply.assignments)
    }

    /// Expire a pending assignment. `Ok(false)` when it was no longer pending.
    pub async fn expire_assignment(
        &self,
        lead_id: &str,
        agent_id: &str,
    ) -> Result<bool, RoutingError> {
        let request = ExpireAssignment {
            lead_id: lead_id.to_string(),
            agent_id: agent_id.to_string(),
        };
        self.call(&request)
            .await
            .map(|reply| reply.expired)
            .map_err(|e| RoutingError::from_breaker(lead_id, DATA_SERVICE, e))
    }

    async fn call<R: topics::BusRequest>(&self, request: &R) -> Result<R::Response, BreakerError> {
        self.breakers
            .execute(DATA_SERVICE, || {
                topics::call(self.bus.as_ref(), request, self.timeout)
            })
            .await
    }
}

/// Publishes notification and analytics events.
#[derive(Clone)]
pub struct EventPublisher {
    bus: Arc<dyn MessageBus>,
    breakers: Arc<CircuitBreakerRegistry>,
}

impl EventPublisher {
    pub fn new(bus: Arc<dyn MessageBus>, breakers: Arc<CircuitBreakerRegistry>) -> Self {
        Self { bus, breakers }
    }

    pub async fn notify(&self, lead_id: &str, agent: &RankedAgent) -> Result<(), BreakerError> {
        let event = AgentNotification {
            agent_id: agent.agent_id.clone(),
            lead_id: lead_id.to_string(),
            score: agent.score,
            factors: agent.factors,
        };
        self.breakers
            .execute(NOTIFICATION_SERVICE, || {
                topics::emit(self.bus.as_ref(), &event)
            })
            .await
    }

    /// Put a lead back on `lead.needs_routing` so bus redelivery owns the retry.
    ///
    /// Not breaker-wrapped: the event is addressed to this service itself.
    pub async fn needs_routing(
        &self,
        lead_id: &str,
        exclude_agent_ids: Vec<String>,
    ) -> Result<(), TransportError> {
        let event = NeedsRouting {
            lead_id: lead_id.to_string(),
            exclude_agent_ids,
        };
        topics::emit(self.bus.as_ref(), &event).await
    }

    pub async fn routing_decision(&self, decision: &RoutingDecision) -> Result<(), BreakerError> {
        let event = RoutingDecisionEvent {
            decision: decision.clone(),
        };
        self.breakers
            .execute(ANALYTICS_SERVICE, || {
                topics::emit(self.bus.as_ref(), &event)
            })
            .await
    }
}
