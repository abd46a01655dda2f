//! Factor weights for agent ranking

use serde::{Deserialize, Serialize};

/// Allowed drift when checking that weights sum to 1.0
const WEIGHT_SUM_TOLERANCE: f64 = 0.001;

/// Relative weight of each routing factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorWeights {
    /// Weight for insurance-type specialization match
    pub specialization: f64,

    /// Weight for lead/agent location proximity
    pub location: f64,

    /// Weight for blended rating, conversion and responsiveness
    pub performance: f64,

    /// Weight for spare capacity
    pub workload: f64,

    /// Weight for lead quality vs agent seniority alignment
    pub quality_tier: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            specialization: 0.25,
            location: 0.15,
            performance: 0.30,
            workload: 0.20,
            quality_tier: 0.10,
        }
    }
}

impl FactorWeights {
    /// Validate that weights are non-negative and sum to 1.0
    pub fn validate(&self) -> Result<(), String> {
        let all = [
            ("specialization", self.specialization),
            ("location", self.location),
            ("performance", self.performance),
            ("workload", self.workload),
            ("quality_tier", self.quality_tier),
        ];
        if let Some((name, value)) = all.iter().find(|(_, w)| !w.is_finite() || *w < 0.0) {
            return Err(format!(
                "Weight '{}' must be a non-negative number, got {}",
                name, value
            ));
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            Err(format!("Factor weights must sum to 1.0, got {:.3}", sum))
        } else {
            Ok(())
        }
    }

    pub fn sum(&self) -> f64 {
        self.specialization + self.location + self.performance + self.workload + self.quality_tier
    }
}
