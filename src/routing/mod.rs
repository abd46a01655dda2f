//! Lead routing orchestration
//!
//! Turns a "lead needs routing" event into committed assignments:
//! fetch lead and candidates, rank, select against the confidence threshold,
//! commit, notify, and publish the decision for analytics. Steps for one lead
//! run strictly in sequence; different leads route concurrently.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;

pub mod client;
pub mod consumer;
pub mod error;
pub mod history;
pub mod selection;

pub use client::{DataServiceClient, EventPublisher};
pub use consumer::RoutingConsumer;
pub use error::RoutingError;
pub use history::RoutingHistory;
pub use selection::{select, Selection};

use crate::breaker::CircuitBreakerRegistry;
use crate::config::{BelowThresholdPolicy, RouterConfig, RoutingConfig};
use crate::model::{FailedAssignment, RankedAgent, RoutingDecision};
use crate::ranking::Ranker;
use crate::transport::topics::{AGENT_NOTIFY, ROUTING_DECISION};
use crate::transport::MessageBus;

/// Routes leads to agents
pub struct Orchestrator {
    data: DataServiceClient,
    publisher: EventPublisher,
    ranker: Ranker,
    history: Arc<RoutingHistory>,
    config: RoutingConfig,
}

impl Orchestrator {
    pub fn new(
        data: DataServiceClient,
        publisher: EventPublisher,
        ranker: Ranker,
        config: RoutingConfig,
    ) -> Self {
        let history = Arc::new(RoutingHistory::new(config.history_window_hours));
        Self {
            data,
            publisher,
            ranker,
            history,
            config,
        }
    }

    /// Wire an orchestrator from the full configuration
    pub fn from_config(
        bus: Arc<dyn MessageBus>,
        breakers: Arc<CircuitBreakerRegistry>,
        config: &RouterConfig,
    ) -> Self {
        let data = DataServiceClient::new(
            Arc::clone(&bus),
            Arc::clone(&breakers),
            config.transport.request_timeout(),
        );
        let publisher = EventPublisher::new(bus, breakers);
        Self::new(
            data,
            publisher,
            Ranker::new(config.ranking.clone()),
            config.routing.clone(),
        )
    }

    pub fn history(&self) -> &Arc<RoutingHistory> {
        &self.history
    }

    pub fn data(&self) -> &DataServiceClient {
        &self.data
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub async fn route_lead(&self, lead_id: &str) -> Result<RoutingDecision, RoutingError> {
        self.route_lead_excluding(lead_id, &[]).await
    }

    /// Route `lead_id`, never selecting any agent in `excluded`
    pub async fn route_lead_excluding(
        &self,
        lead_id: &str,
        excluded: &[String],
    ) -> Result<RoutingDecision, RoutingError> {
        let start = Instant::now();
        let result = self.route(lead_id, excluded).await;

        metrics::histogram!("leadrouter_routing_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        let outcome = match &result {
            Ok(d) if d.escalated => "escalated",
            Ok(d) if d.assignments.is_empty() => "noop",
            Ok(d) if d.is_partial() => "partial",
            Ok(_) => "routed",
            Err(e) => e.code(),
        };
        metrics::counter!("leadrouter_routing_attempts_total", "outcome" => outcome).increment(1);

        match &result {
            Ok(decision) => tracing::info!(
                lead_id,
                decision_id = %decision.decision_id,
                assigned = ?decision.assigned_agent_ids(),
                failed = decision.failed.len(),
                below_threshold = decision.below_threshold,
                escalated = decision.escalated,
                "Lead routed"
            ),
            Err(e) => tracing::warn!(lead_id, code = e.code(), error = %e, "Routing failed"),
        }
        result
    }

    async fn route(
        &self,
        lead_id: &str,
        excluded: &[String],
    ) -> Result<RoutingDecision, RoutingError> {
        let lead = self.data.get_lead(lead_id).await?;
        if !lead.status.is_routable() {
            return Err(RoutingError::validation(
                lead_id,
                format!("lead is {} and cannot be routed", lead.status.as_str()),
            ));
        }

        let excluded: BTreeSet<&str> = excluded.iter().map(String::as_str).collect();
        let candidates: Vec<_> = self
            .data
            .match_agents(
                &lead,
                self.config.candidate_pool_size,
                excluded.iter().map(|id| id.to_string()).collect(),
            )
            .await?
            .into_iter()
            .filter(|agent| !excluded.contains(agent.id.as_str()))
            .collect();
        if candidates.is_empty() {
            return Err(RoutingError::validation(lead_id, "no candidate agents"));
        }

        let recent = self
            .history
            .recent_counts(candidates.iter().map(|a| a.id.as_str()));
        let ranked = self.ranker.rank_with_history(&lead, &candidates, &recent);
        let mut decision = RoutingDecision::new(lead_id, candidates.len());

        let slots = self
            .config
            .max_agents_per_lead
            .saturating_sub(lead.pending_agent_ids.len());
        if slots == 0 {
            tracing::debug!(
                lead_id,
                pending = lead.pending_agent_ids.len(),
                "Lead already holds the maximum pending assignments"
            );
            self.publish_decision(&decision).await;
            return Ok(decision);
        }

        let pending: HashSet<&str> = lead.pending_agent_ids.iter().map(String::as_str).collect();
        let selected = match select(
            &ranked,
            &pending,
            slots,
            self.config.min_confidence_threshold,
        ) {
            Selection::Qualified(agents) => agents,
            // Redelivery for a lead that already holds someone: nothing better to add
            Selection::NoEligible | Selection::BelowThreshold(_) if !pending.is_empty() => {
                tracing::debug!(
                    lead_id,
                    pending = ?lead.pending_agent_ids,
                    "No further qualified agents for a lead with pending assignments"
                );
                self.publish_decision(&decision).await;
                return Ok(decision);
            }
            Selection::NoEligible => {
                return Err(RoutingError::NoEligibleCandidates {
                    lead_id: lead_id.to_string(),
                })
            }
            Selection::BelowThreshold(best) => {
                decision.below_threshold = true;
                metrics::counter!("leadrouter_below_threshold_total").increment(1);

                match self.config.below_threshold_policy {
                    BelowThresholdPolicy::FallbackBest => {
                        tracing::warn!(
                            lead_id,
                            agent_id = %best.agent_id,
                            score = best.score,
                            threshold = self.config.min_confidence_threshold,
                            "No candidate cleared the confidence threshold, falling back to best"
                        );
                        vec![best]
                    }
                    BelowThresholdPolicy::Escalate => {
                        tracing::warn!(
                            lead_id,
                            best_score = best.score,
                            threshold = self.config.min_confidence_threshold,
                            "No candidate cleared the confidence threshold, escalating"
                        );
                        let reason = format!(
                            "best score {:.1} below threshold {:.2}",
                            best.score, self.config.min_confidence_threshold
                        );
                        self.data.escalate_lead(lead_id, &reason).await?;
                        decision.escalated = true;
                        self.publish_decision(&decision).await;
                        return Ok(decision);
                    }
                }
            }
        };

        let first_error = self.commit_all(&mut decision, selected).await;
        self.publish_decision(&decision).await;

        match first_error {
            Some(err) if decision.assignments.is_empty() => Err(err),
            _ => Ok(decision),
        }
    }

    /// Commit each selected agent in order. Returns the first hard failure.
    async fn commit_all(
        &self,
        decision: &mut RoutingDecision,
        selected: Vec<RankedAgent>,
    ) -> Option<RoutingError> {
        let lead_id = decision.lead_id.clone();
        let mut first_error = None;

        for agent in selected {
            match self.data.assign(&lead_id, &agent.agent_id).await {
                Ok(_) => {
                    metrics::counter!("leadrouter_assignments_total", "result" => "created")
                        .increment(1);
                    self.history.record(&agent.agent_id);
                }
                Err(RoutingError::AssignmentConflict { .. }) => {
                    metrics::counter!("leadrouter_assignments_total", "result" => "existing")
                        .increment(1);
                    tracing::debug!(
                        lead_id = %lead_id,
                        agent_id = %agent.agent_id,
                        "Assignment already existed"
                    );
                }
                Err(err) => {
                    metrics::counter!("leadrouter_assignments_total", "result" => "failed")
                        .increment(1);
                    tracing::warn!(
                        lead_id = %lead_id,
                        agent_id = %agent.agent_id,
                        code = err.code(),
                        error = %err,
                        "Assignment commit failed"
                    );
                    decision.failed.push(FailedAssignment {
                        agent_id: agent.agent_id.clone(),
                        code: err.code().to_string(),
                        message: err.to_string(),
                    });
                    first_error.get_or_insert(err);
                    continue;
                }
            }

            if let Err(err) = self.publisher.notify(&lead_id, &agent).await {
                metrics::counter!("leadrouter_publish_failures_total", "topic" => AGENT_NOTIFY)
                    .increment(1);
                tracing::warn!(
                    lead_id = %lead_id,
                    agent_id = %agent.agent_id,
                    error = %err,
                    "Failed to publish agent notification"
                );
            }
            decision.assignments.push(agent);
        }

        first_error
    }

    async fn publish_decision(&self, decision: &RoutingDecision) {
        if let Err(err) = self.publisher.routing_decision(decision).await {
            metrics::counter!("leadrouter_publish_failures_total", "topic" => ROUTING_DECISION)
                .increment(1);
            tracing::warn!(
                lead_id = %decision.lead_id,
                decision_id = %decision.decision_id,
                error = %err,
                "Failed to publish routing decision"
            );
        }
    }
}
