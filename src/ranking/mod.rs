//! Multi-factor agent ranking.
//!
//! Ranking is a pure function of the lead, the candidate snapshot and the
//! configured weights: no I/O, no clocks, no randomness. Replaying the same
//! inputs always yields the same order and the same scores.

use std::collections::HashMap;

pub mod factors;
pub mod weights;

pub use factors::{LocationBuckets, PerformanceBlend, Region, Tier};
pub use weights::FactorWeights;

use crate::config::RankingConfig;
use crate::model::{Agent, Lead, RankedAgent, RoutingFactors};

/// Scores candidate agents against a lead.
#[derive(Debug, Clone, Default)]
pub struct Ranker {
    config: RankingConfig,
}

impl Ranker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Rank candidates, best first. Ties are broken by agent id ascending.
    ///
    /// An empty candidate slice yields an empty ranking.
    pub fn rank(&self, lead: &Lead, candidates: &[Agent]) -> Vec<RankedAgent> {
        self.rank_with_history(lead, candidates, &HashMap::new())
    }

    /// Rank candidates using recent assignment counts as a soft load signal.
    ///
    /// With `history_penalty == 0` this is identical to [`Ranker::rank`].
    pub fn rank_with_history(
        &self,
        lead: &Lead,
        candidates: &[Agent],
        recent_assignments: &HashMap<String, u32>,
    ) -> Vec<RankedAgent> {
        let mut ranked: Vec<RankedAgent> = candidates
            .iter()
            .map(|agent| {
                let recent = recent_assignments.get(&agent.id).copied().unwrap_or(0);
                let factors = self.factors(lead, agent, recent);
                let score = self.weighted_score(&factors);
                RankedAgent {
                    agent_id: agent.id.clone(),
                    score,
                    confidence: score / 100.0,
                    factors,
                    eligible: !agent.is_at_capacity(),
                }
            })
            .collect();

        ranked.sort_by(RankedAgent::ranking_order);
        ranked
    }

    /// Compute the factor breakdown for a single (lead, agent) pair.
    pub fn factors(&self, lead: &Lead, agent: &Agent, recent_assignments: u32) -> RoutingFactors {
        let mut workload = factors::workload_score(agent);
        if self.config.history_penalty > 0.0 && recent_assignments > 0 {
            let damping = (recent_assignments as f64 * self.config.history_penalty).min(1.0);
            workload *= 1.0 - damping;
        }

        RoutingFactors {
            specialization: factors::specialization_score(
                agent,
                &lead.insurance_type,
                self.config.partial_specialization_credit,
            ),
            location: factors::location_score(
                &lead.location,
                &agent.location,
                &self.config.location,
            ),
            performance: factors::performance_score(agent, &self.config.performance),
            workload,
            quality_tier: factors::quality_tier_score(lead, agent),
        }
    }

    /// Weighted sum of factors scaled to 0..=100.
    pub fn weighted_score(&self, factors: &RoutingFactors) -> f64 {
        let w = &self.config.weights;
        let total = w.sum();
        if total <= 0.0 {
            return 0.0;
        }

        let sum = factors.specialization * w.specialization
            + factors.location * w.location
            + factors.performance * w.performance
            + factors.workload * w.workload
            + factors.quality_tier * w.quality_tier;

        (sum / total * 100.0).clamp(0.0, 100.0)
    }
}
