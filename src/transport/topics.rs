//! Typed request/response schemas per bus topic.
//!
//! Payloads are validated here, at the transport boundary, so nothing
//! downstream ever sees untyped JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::{MessageBus, TransportError};
use crate::model::{
    Agent, Assignment, InsuranceType, Lead, Location, RoutingDecision, RoutingFactors,
    StaleAssignment,
};

pub const NEEDS_ROUTING: &str = "lead.needs_routing";
pub const LEAD_GET: &str = "lead.get";
pub const AGENTS_MATCH: &str = "agents.match";
pub const LEAD_ASSIGN: &str = "lead.assign";
pub const LEAD_ESCALATE: &str = "lead.escalate";
pub const ASSIGNMENTS_STALE: &str = "assignments.stale";
pub const ASSIGNMENT_EXPIRE: &str = "assignment.expire";
pub const AGENT_NOTIFY: &str = "agent.notify";
pub const ROUTING_DECISION: &str = "analytics.routing_decision";

/// A request/reply exchange bound to a topic.
pub trait BusRequest: Serialize + Send + Sync {
    const TOPIC: &'static str;
    type Response: DeserializeOwned;
}

/// A fire-and-forget event bound to a topic.
pub trait BusEvent: Serialize + DeserializeOwned + Send + Sync {
    const TOPIC: &'static str;
}

/// `lead.needs_routing`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeedsRouting {
    pub lead_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_agent_ids: Vec<String>,
}

impl BusEvent for NeedsRouting {
    const TOPIC: &'static str = NEEDS_ROUTING;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLead {
    pub lead_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadReply {
    pub lead: Lead,
}

impl BusRequest for GetLead {
    const TOPIC: &'static str = LEAD_GET;
    type Response = LeadReply;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchAgents {
    pub lead_id: String,
    pub insurance_type: InsuranceType,
    pub location: Location,
    pub limit: usize,
    #[serde(default)]
    pub exclude_agent_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReply {
    pub agents: Vec<Agent>,
}

impl BusRequest for MatchAgents {
    const TOPIC: &'static str = AGENTS_MATCH;
    type Response = MatchReply;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignLead {
    pub lead_id: String,
    pub agent_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignReply {
    pub assignment: Assignment,
    /// False when the assignment already existed
    #[serde(default = "default_true")]
    pub created: bool,
}

impl BusRequest for AssignLead {
    const TOPIC: &'static str = LEAD_ASSIGN;
    type Response = AssignReply;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalateLead {
    pub lead_id: String,
    pub reason: String,
}

impl BusRequest for EscalateLead {
    const TOPIC: &'static str = LEAD_ESCALATE;
    type Response = LeadReply;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleAssignments {
    pub older_than_ms: u64,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleReply {
    pub assignments: Vec<StaleAssignment>,
}

impl BusRequest for StaleAssignments {
    const TOPIC: &'static str = ASSIGNMENTS_STALE;
    type Response = StaleReply;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpireAssignment {
    pub lead_id: String,
    pub agent_id: String,
}

/// `expired == false` means the assignment was no longer pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpireReply {
    pub expired: bool,
    #[serde(default)]
    pub assignment: Option<Assignment>,
}

impl BusRequest for ExpireAssignment {
    const TOPIC: &'static str = ASSIGNMENT_EXPIRE;
    type Response = ExpireReply;
}

/// `agent.notify`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentNotification {
    pub agent_id: String,
    pub lead_id: String,
    pub score: f64,
    pub factors: RoutingFactors,
}

impl BusEvent for AgentNotification {
    const TOPIC: &'static str = AGENT_NOTIFY;
}

/// `analytics.routing_decision`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecisionEvent {
    pub decision: RoutingDecision,
}

impl BusEvent for RoutingDecisionEvent {
    const TOPIC: &'static str = ROUTING_DECISION;
}

/// Error body a responder may send instead of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorReply {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn default_true() -> bool {
    true
}

pub fn encode<T: Serialize>(topic: &str, payload: &T) -> Result<Value, TransportError> {
    serde_json::to_value(payload).map_err(|e| TransportError::invalid(topic, e))
}

/// Decode a reply, turning `{"error": {...}}` bodies into rejections.
pub fn decode<T: DeserializeOwned>(topic: &str, value: Value) -> Result<T, TransportError> {
    if value.get("error").is_some_and(Value::is_object) {
        if let Ok(reply) = serde_json::from_value::<ErrorReply>(value.clone()) {
            return Err(TransportError::Rejected {
                topic: topic.to_string(),
                code: reply.error.code,
                message: reply.error.message,
            });
        }
    }
    serde_json::from_value(value).map_err(|e| TransportError::invalid(topic, e))
}

/// Send a typed request and decode the typed reply.
pub async fn call<R: BusRequest>(
    bus: &dyn MessageBus,
    request: &R,
    timeout: Duration,
) -> Result<R::Response, TransportError> {
    let payload = encode(R::TOPIC, request)?;
    let reply = bus.request(R::TOPIC, payload, timeout).await?;
    decode(R::TOPIC, reply)
}

/// Publish a typed event.
pub async fn emit<E: BusEvent>(bus: &dyn MessageBus, event: &E) -> Result<(), TransportError> {
    let payload = encode(E::TOPIC, event)?;
    bus.publish(E::TOPIC, payload).await
}
