//! Shared test utilities for leadrouter integration tests.
//!
//! Provides an in-memory bus with a stateful fake data service behind it,
//! plus builders for the agents used across scenarios.

#![allow(dead_code)]

use chrono::Utc;
use leadrouter::breaker::CircuitBreakerRegistry;
use leadrouter::config::RouterConfig;
use leadrouter::model::{
    Agent, Assignment, AssignmentStatus, InsuranceType, Lead, LeadStatus, Location,
    StaleAssignment,
};
use leadrouter::routing::Orchestrator;
use leadrouter::transport::topics::{
    AssignLead, AssignReply, EscalateLead, ErrorReply, ExpireAssignment, ExpireReply, GetLead,
    LeadReply, MatchAgents, MatchReply, StaleAssignments, StaleReply, AGENTS_MATCH,
    ASSIGNMENTS_STALE, ASSIGNMENT_EXPIRE, LEAD_ASSIGN, LEAD_ESCALATE, LEAD_GET,
};
use leadrouter::transport::{InMemoryBus, MessageBus, TransportError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

// =============================================================================
// Agent Builders
// =============================================================================

/// Auto specialist in CA with a strong track record. Scores around 91.
pub fn strong_agent(id: &str) -> Agent {
    let mut agent = Agent::new(id, Location::in_state("CA"), 10);
    agent.specializations.insert(InsuranceType::Auto);
    agent.rating = 4.8;
    agent.conversion_rate = 0.5;
    agent.avg_response_time_secs = 120;
    agent.current_lead_count = 1;
    agent
}

/// Home specialist in NY with weak numbers. Scores around 40 for an auto lead in CA.
pub fn mid_agent(id: &str) -> Agent {
    let mut agent = Agent::new(id, Location::in_state("NY"), 10);
    agent.specializations.insert(InsuranceType::Home);
    agent.rating = 3.0;
    agent.conversion_rate = 0.1;
    agent.avg_response_time_secs = 2000;
    agent.current_lead_count = 5;
    agent
}

/// Like [`mid_agent`] but specialized in auto. Scores around 53.
pub fn fair_agent(id: &str) -> Agent {
    let mut agent = mid_agent(id);
    agent.specializations.insert(InsuranceType::Auto);
    agent
}

/// Strong on paper but with no free capacity.
pub fn full_agent(id: &str) -> Agent {
    let mut agent = strong_agent(id);
    agent.current_lead_count = agent.max_lead_capacity;
    agent
}

pub fn auto_lead_in_ca(id: &str) -> Lead {
    Lead::new(id, InsuranceType::Auto, Location::in_state("CA"))
}

// =============================================================================
// Fake Data Service
// =============================================================================

/// State behind the fake data service.
#[derive(Debug, Default)]
pub struct FakeState {
    pub leads: HashMap<String, Lead>,
    pub agents: Vec<Agent>,
    pub assignments: Vec<Assignment>,
    pub stale: Vec<StaleAssignment>,
    pub escalations: Vec<(String, String)>,
    pub match_requests: Vec<MatchAgents>,
    pub assign_requests: Vec<AssignLead>,
    pub expire_requests: Vec<ExpireAssignment>,
    /// Topics that answer with a server error
    pub outages: HashSet<String>,
    /// Agents whose assignment commit fails with a server error
    pub failing_agents: HashSet<String>,
}

/// Answers the data-service topics on an [`InMemoryBus`] from shared state.
#[derive(Clone)]
pub struct FakeDataService {
    state: Arc<Mutex<FakeState>>,
}

fn lock(state: &Mutex<FakeState>) -> MutexGuard<'_, FakeState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn parse<T: DeserializeOwned>(topic: &str, payload: Value) -> Result<T, TransportError> {
    serde_json::from_value(payload).map_err(|e| TransportError::InvalidPayload {
        topic: topic.to_string(),
        message: e.to_string(),
    })
}

fn reply<T: Serialize>(value: T) -> Result<Value, TransportError> {
    Ok(serde_json::to_value(value).unwrap())
}

fn outage(topic: &str) -> TransportError {
    TransportError::Unavailable {
        topic: topic.to_string(),
        message: "503 Service Unavailable".to_string(),
    }
}

impl FakeDataService {
    /// Register responders for every data-service topic on `bus`.
    pub fn install(bus: &InMemoryBus) -> Self {
        let fake = Self {
            state: Arc::new(Mutex::new(FakeState::default())),
        };

        let s = Arc::clone(&fake.state);
        bus.respond(LEAD_GET, move |payload| {
            let mut state = lock(&s);
            if state.outages.contains(LEAD_GET) {
                return Err(outage(LEAD_GET));
            }
            let request: GetLead = parse(LEAD_GET, payload)?;
            match state.leads.get_mut(&request.lead_id) {
                Some(lead) => reply(LeadReply { lead: lead.clone() }),
                None => Ok(ErrorReply::new(
                    "not_found",
                    format!("lead {} does not exist", request.lead_id),
                )
                .into_value()),
            }
        });

        let s = Arc::clone(&fake.state);
        bus.respond(AGENTS_MATCH, move |payload| {
            let mut state = lock(&s);
            if state.outages.contains(AGENTS_MATCH) {
                return Err(outage(AGENTS_MATCH));
            }
            let request: MatchAgents = parse(AGENTS_MATCH, payload)?;
            let agents: Vec<Agent> = state
                .agents
                .iter()
                .filter(|a| !request.exclude_agent_ids.contains(&a.id))
                .take(request.limit)
                .cloned()
                .collect();
            state.match_requests.push(request);
            reply(MatchReply { agents })
        });

        let s = Arc::clone(&fake.state);
        bus.respond(LEAD_ASSIGN, move |payload| {
            let mut state = lock(&s);
            if state.outages.contains(LEAD_ASSIGN) {
                return Err(outage(LEAD_ASSIGN));
            }
            let request: AssignLead = parse(LEAD_ASSIGN, payload)?;
            state.assign_requests.push(request.clone());
            if state.failing_agents.contains(&request.agent_id) {
                return Err(outage(LEAD_ASSIGN));
            }

            if let Some(existing) = state.assignments.iter().find(|a| {
                a.lead_id == request.lead_id
                    && a.agent_id == request.agent_id
                    && a.status != AssignmentStatus::Expired
            }) {
                return reply(AssignReply {
                    assignment: existing.clone(),
                    created: false,
                });
            }

            let assignment = Assignment {
                lead_id: request.lead_id.clone(),
                agent_id: request.agent_id.clone(),
                assigned_at: Utc::now(),
                status: AssignmentStatus::Pending,
            };
            state.assignments.push(assignment.clone());
            if let Some(lead) = state.leads.get_mut(&request.lead_id) {
                lead.status = LeadStatus::PendingAck;
                lead.pending_agent_ids.push(request.agent_id.clone());
            }
            if let Some(agent) = state.agents.iter_mut().find(|a| a.id == request.agent_id) {
                agent.current_lead_count += 1;
            }
            reply(AssignReply {
                assignment,
                created: true,
            })
        });

        let s = Arc::clone(&fake.state);
        bus.respond(LEAD_ESCALATE, move |payload| {
            let mut state = lock(&s);
            if state.outages.contains(LEAD_ESCALATE) {
                return Err(outage(LEAD_ESCALATE));
            }
            let request: EscalateLead = parse(LEAD_ESCALATE, payload)?;
            state
                .escalations
                .push((request.lead_id.clone(), request.reason.clone()));
            match state.leads.get_mut(&request.lead_id) {
                Some(lead) => {
                    lead.status = LeadStatus::Escalated;
                    reply(LeadReply { lead: lead.clone() })
                }
                None => Ok(ErrorReply::new("not_found", "unknown lead").into_value()),
            }
        });

        let s = Arc::clone(&fake.state);
        bus.respond(ASSIGNMENTS_STALE, move |payload| {
            let state = lock(&s);
            if state.outages.contains(ASSIGNMENTS_STALE) {
                return Err(outage(ASSIGNMENTS_STALE));
            }
            let request: StaleAssignments = parse(ASSIGNMENTS_STALE, payload)?;
            let assignments = state.stale.iter().take(request.limit).cloned().collect();
            reply(StaleReply { assignments })
        });

        let s = Arc::clone(&fake.state);
        bus.respond(ASSIGNMENT_EXPIRE, move |payload| {
            let mut state = lock(&s);
            if state.outages.contains(ASSIGNMENT_EXPIRE) {
                return Err(outage(ASSIGNMENT_EXPIRE));
            }
            let request: ExpireAssignment = parse(ASSIGNMENT_EXPIRE, payload)?;
            state.expire_requests.push(request.clone());

            let Some(assignment) = state.assignments.iter_mut().find(|a| {
                a.lead_id == request.lead_id
                    && a.agent_id == request.agent_id
                    && a.status == AssignmentStatus::Pending
            }) else {
                return reply(ExpireReply {
                    expired: false,
                    assignment: None,
                });
            };
            assignment.status = AssignmentStatus::Expired;
            let expired = assignment.clone();

            if let Some(lead) = state.leads.get_mut(&request.lead_id) {
                lead.pending_agent_ids.retain(|id| id != &request.agent_id);
                if lead.pending_agent_ids.is_empty() {
                    lead.status = LeadStatus::Unrouted;
                }
            }
            reply(ExpireReply {
                expired: true,
                assignment: Some(expired),
            })
        });

        fake
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        lock(&self.state)
    }

    pub fn add_lead(&self, lead: Lead) {
        self.state().leads.insert(lead.id.clone(), lead);
    }

    pub fn add_agents(&self, agents: Vec<Agent>) {
        self.state().agents.extend(agents);
    }

    pub fn lead(&self, lead_id: &str) -> Lead {
        self.state().leads[lead_id].clone()
    }

    pub fn set_outage(&self, topic: &str, down: bool) {
        let mut state = self.state();
        if down {
            state.outages.insert(topic.to_string());
        } else {
            state.outages.remove(topic);
        }
    }

    pub fn fail_assignments_for(&self, agent_id: &str) {
        self.state().failing_agents.insert(agent_id.to_string());
    }

    /// Assignments for `lead_id` that are not expired, as (agent, status).
    pub fn live_assignments(&self, lead_id: &str) -> Vec<(String, AssignmentStatus)> {
        self.state()
            .assignments
            .iter()
            .filter(|a| a.lead_id == lead_id && a.status != AssignmentStatus::Expired)
            .map(|a| (a.agent_id.clone(), a.status))
            .collect()
    }

    /// Simulate the agent accepting the lead.
    pub fn acknowledge(&self, lead_id: &str, agent_id: &str) {
        let mut state = self.state();
        if let Some(a) = state
            .assignments
            .iter_mut()
            .find(|a| a.lead_id == lead_id && a.agent_id == agent_id)
        {
            a.status = AssignmentStatus::Acknowledged;
        }
        if let Some(lead) = state.leads.get_mut(lead_id) {
            lead.pending_agent_ids.retain(|id| id != agent_id);
            lead.status = LeadStatus::Assigned;
        }
    }

    /// Report every pending assignment of `lead_id` as stale.
    pub fn mark_stale(&self, lead_id: &str, reassignment_count: u32, previous: &[&str]) {
        let mut state = self.state();
        let stale: Vec<StaleAssignment> = state
            .assignments
            .iter()
            .filter(|a| a.lead_id == lead_id && a.status == AssignmentStatus::Pending)
            .map(|a| StaleAssignment {
                lead_id: a.lead_id.clone(),
                agent_id: a.agent_id.clone(),
                assigned_at: a.assigned_at,
                reassignment_count,
                previous_agent_ids: previous.iter().map(|s| s.to_string()).collect(),
            })
            .collect();
        state.stale.extend(stale);
    }

    pub fn clear_stale(&self) {
        self.state().stale.clear();
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Everything a routing scenario needs.
pub struct Harness {
    pub bus: Arc<InMemoryBus>,
    pub data: FakeDataService,
    pub breakers: Arc<CircuitBreakerRegistry>,
    pub orchestrator: Arc<Orchestrator>,
    pub config: RouterConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        let bus = Arc::new(InMemoryBus::new());
        let data = FakeDataService::install(&bus);
        let breakers = Arc::new(CircuitBreakerRegistry::new(config.breaker.clone()));
        let orchestrator = Arc::new(Orchestrator::from_config(
            Arc::clone(&bus) as Arc<dyn MessageBus>,
            Arc::clone(&breakers),
            &config,
        ));
        Self {
            bus,
            data,
            breakers,
            orchestrator,
            config,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
