//! Stale-lead sweeper
//!
//! Periodically finds assignments that were never acknowledged, expires them
//! and sends the lead back through routing without the agents that let it
//! go stale. Leads that have been re-routed too often are escalated instead.
//! A lead is only touched once every stale assignment of it has actually
//! moved to `expired`. If re-routing then fails, the lead is handed back to
//! the bus when the failure is transient and escalated otherwise.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::breaker::BreakerError;
use crate::config::SweeperConfig;
use crate::model::StaleAssignment;
use crate::routing::Orchestrator;

/// Counters for one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Leads with at least one stale assignment
    pub examined: usize,
    /// Assignments moved to `expired`
    pub expired: usize,
    pub rerouted: usize,
    /// Leads put back on `lead.needs_routing` after a transient failure
    pub requeued: usize,
    pub escalated: usize,
    /// Leads left alone because an assignment was no longer pending
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeadAction {
    Rerouted,
    Requeued,
    Escalated,
    Skipped,
    Failed,
}

impl LeadAction {
    fn as_str(&self) -> &'static str {
        match self {
            LeadAction::Rerouted => "rerouted",
            LeadAction::Requeued => "requeued",
            LeadAction::Escalated => "escalated",
            LeadAction::Skipped => "skipped",
            LeadAction::Failed => "failed",
        }
    }
}

/// Background service that re-routes unacknowledged leads.
pub struct StaleLeadSweeper {
    orchestrator: Arc<Orchestrator>,
    config: SweeperConfig,
}

impl StaleLeadSweeper {
    pub fn new(orchestrator: Arc<Orchestrator>, config: SweeperConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    /// Run one sweep.
    ///
    /// Fails only when the stale-assignment query itself fails; per-lead
    /// failures are counted in the report.
    pub async fn sweep(&self) -> Result<SweepReport, BreakerError> {
        let stale = self
            .orchestrator
            .data()
            .stale_assignments(self.config.escalation_timeout(), self.config.batch_size)
            .await?;

        let mut by_lead: BTreeMap<String, Vec<StaleAssignment>> = BTreeMap::new();
        for assignment in stale {
            by_lead
                .entry(assignment.lead_id.clone())
                .or_default()
                .push(assignment);
        }

        let mut report = SweepReport {
            examined: by_lead.len(),
            ..SweepReport::default()
        };

        let results: Vec<(LeadAction, usize)> = stream::iter(by_lead)
            .map(|(lead_id, assignments)| self.process_lead(lead_id, assignments))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        for (action, expired) in results {
            metrics::counter!("leadrouter_sweeper_leads_total", "action" => action.as_str())
                .increment(1);
            report.expired += expired;
            match action {
                LeadAction::Rerouted => report.rerouted += 1,
                LeadAction::Requeued => report.requeued += 1,
                LeadAction::Escalated => report.escalated += 1,
                LeadAction::Skipped => report.skipped += 1,
                LeadAction::Failed => report.failed += 1,
            }
        }

        Ok(report)
    }

    /// Handle every stale assignment of one lead. Returns the action taken
    /// and how many assignments were expired.
    async fn process_lead(
        &self,
        lead_id: String,
        assignments: Vec<StaleAssignment>,
    ) -> (LeadAction, usize) {
        let reassignments = assignments
            .iter()
            .map(|a| a.reassignment_count)
            .max()
            .unwrap_or(0);

        let mut excluded: BTreeSet<String> = BTreeSet::new();
        let mut expired = 0;
        let mut lost_race = false;
        let mut failed = false;

        for assignment in &assignments {
            excluded.extend(assignment.previous_agent_ids.iter().cloned());
            match self
                .orchestrator
                .data()
                .expire_assignment(&lead_id, &assignment.agent_id)
                .await
            {
                Ok(true) => {
                    expired += 1;
                    excluded.insert(assignment.agent_id.clone());
                }
                Ok(false) => {
                    tracing::debug!(
                        lead_id = %lead_id,
                        agent_id = %assignment.agent_id,
                        "Assignment no longer pending, leaving lead alone"
                    );
                    lost_race = true;
                }
                Err(e) => {
                    tracing::warn!(
                        lead_id = %lead_id,
                        agent_id = %assignment.agent_id,
                        error = %e,
                        "Failed to expire stale assignment"
                    );
                    failed = true;
                }
            }
        }

        if lost_race {
            return (LeadAction::Skipped, expired);
        }
        if failed {
            return (LeadAction::Failed, expired);
        }

        if reassignments >= self.config.max_reassignments {
            let reason = format!("not acknowledged after {} reassignments", reassignments);
            return (self.escalate(&lead_id, &reason).await, expired);
        }

        let excluded: Vec<String> = excluded.into_iter().collect();
        let result = self
            .orchestrator
            .route_lead_excluding(&lead_id, &excluded)
            .await;
        let action = match result {
            Ok(decision) => {
                tracing::info!(
                    lead_id = %lead_id,
                    excluded = ?excluded,
                    assigned = ?decision.assigned_agent_ids(),
                    "Re-routed stale lead"
                );
                LeadAction::Rerouted
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    lead_id = %lead_id,
                    code = e.code(),
                    error = %e,
                    "Re-route failed, handing lead back to the bus"
                );
                self.requeue(&lead_id, excluded).await
            }
            Err(e) => {
                tracing::warn!(
                    lead_id = %lead_id,
                    code = e.code(),
                    error = %e,
                    "No agent left for stale lead"
                );
                let reason = format!("no agent left after expiry ({})", e.code());
                self.escalate(&lead_id, &reason).await
            }
        };
        (action, expired)
    }

    async fn escalate(&self, lead_id: &str, reason: &str) -> LeadAction {
        match self.orchestrator.data().escalate_lead(lead_id, reason).await {
            Ok(_) => {
                tracing::info!(lead_id, reason, "Escalated stale lead");
                LeadAction::Escalated
            }
            Err(e) => {
                tracing::error!(lead_id, error = %e, "Failed to escalate stale lead");
                LeadAction::Failed
            }
        }
    }

    async fn requeue(&self, lead_id: &str, excluded: Vec<String>) -> LeadAction {
        match self
            .orchestrator
            .publisher()
            .needs_routing(lead_id, excluded)
            .await
        {
            Ok(()) => LeadAction::Requeued,
            Err(e) => {
                tracing::error!(lead_id, error = %e, "Failed to requeue stale lead");
                LeadAction::Failed
            }
        }
    }

    /// Start sweeping on a fixed interval until `cancel_token` fires.
    pub fn start(self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            tracing::info!(
                interval_seconds = self.config.interval_seconds,
                escalation_timeout_ms = self.config.escalation_timeout_ms,
                "Stale-lead sweeper started"
            );

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        tracing::info!("Stale-lead sweeper shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        match self.sweep().await {
                            Ok(report) if report.examined > 0 => {
                                tracing::info!(?report, "Sweep completed");
                            }
                            Ok(_) => tracing::debug!("Sweep found no stale assignments"),
                            Err(e) => tracing::warn!(error = %e, "Sweep skipped"),
                        }
                    }
                }
            }
        })
    }
}
