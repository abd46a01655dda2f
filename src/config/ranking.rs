//! Ranking configuration

use serde::{Deserialize, Serialize};

use crate::ranking::{FactorWeights, LocationBuckets, PerformanceBlend};

/// Tunables for the ranking engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub weights: FactorWeights,
    /// Specialization credit for agents who sell other lines only
    pub partial_specialization_credit: f64,
    pub location: LocationBuckets,
    pub performance: PerformanceBlend,
    /// Workload reduction per assignment in the history window (0 disables)
    pub history_penalty: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weights: FactorWeights::default(),
            partial_specialization_credit: 0.5,
            location: LocationBuckets::default(),
            performance: PerformanceBlend::default(),
            history_penalty: 0.0,
        }
    }
}
