//! Individual routing factor computations.
//!
//! Every function here maps its inputs to a sub-score in `0.0..=1.0`.

use crate::model::{Agent, InsuranceType, Lead, LeadPriority, Location};
use serde::{Deserialize, Serialize};

/// US Census regions used for location proximity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Northeast,
    Midwest,
    South,
    West,
}

/// Map a two-letter state code to its census region.
pub fn region_of(state: &str) -> Option<Region> {
    let code = state.trim().to_ascii_uppercase();
    let region = match code.as_str() {
        "CT" | "ME" | "MA" | "NH" | "RI" | "VT" | "NJ" | "NY" | "PA" => Region::Northeast,
        "IL" | "IN" | "MI" | "OH" | "WI" | "IA" | "KS" | "MN" | "MO" | "NE" | "ND" | "SD" => {
            Region::Midwest
        }
        "DE" | "FL" | "GA" | "MD" | "NC" | "SC" | "VA" | "DC" | "WV" | "AL" | "KY" | "MS"
        | "TN" | "AR" | "LA" | "OK" | "TX" => Region::South,
        "AZ" | "CO" | "ID" | "MT" | "NV" | "NM" | "UT" | "WY" | "AK" | "CA" | "HI" | "OR"
        | "WA" => Region::West,
        _ => return None,
    };
    Some(region)
}

/// Proximity scores per distance bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationBuckets {
    pub same_state: f64,
    pub same_region: f64,
    pub other_region: f64,
    /// Used when either side has no (recognised) state
    pub unknown: f64,
}

impl Default for LocationBuckets {
    fn default() -> Self {
        Self {
            same_state: 1.0,
            same_region: 0.6,
            other_region: 0.2,
            unknown: 0.5,
        }
    }
}

/// How rating, conversion rate and response time blend into performance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceBlend {
    pub rating_weight: f64,
    pub conversion_weight: f64,
    pub response_weight: f64,
    /// Response times at or below this are "fast"
    pub fast_response_secs: u64,
    /// Response times at or below this (and above fast) are "medium"
    pub medium_response_secs: u64,
    pub fast_score: f64,
    pub medium_score: f64,
    pub slow_score: f64,
}

impl Default for PerformanceBlend {
    fn default() -> Self {
        Self {
            rating_weight: 0.4,
            conversion_weight: 0.4,
            response_weight: 0.2,
            fast_response_secs: 300,
            medium_response_secs: 1800,
            fast_score: 1.0,
            medium_score: 0.6,
            slow_score: 0.2,
        }
    }
}

/// Seniority/quality tier shared by leads and agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Low = 0,
    Medium = 1,
    High = 2,
}

pub fn specialization_score(
    agent: &Agent,
    insurance_type: &InsuranceType,
    partial_credit: f64,
) -> f64 {
    if agent.specializes_in(insurance_type) {
        1.0
    } else if !agent.specializations.is_empty() {
        clamp_unit(partial_credit)
    } else {
        0.0
    }
}

pub fn location_score(lead: &Location, agent: &Location, buckets: &LocationBuckets) -> f64 {
    let (Some(lead_state), Some(agent_state)) = (lead.state.as_deref(), agent.state.as_deref())
    else {
        return clamp_unit(buckets.unknown);
    };

    if lead_state.trim().eq_ignore_ascii_case(agent_state.trim()) {
        return clamp_unit(buckets.same_state);
    }

    match (region_of(lead_state), region_of(agent_state)) {
        (Some(a), Some(b)) if a == b => clamp_unit(buckets.same_region),
        (Some(_), Some(_)) => clamp_unit(buckets.other_region),
        _ => clamp_unit(buckets.unknown),
    }
}

pub fn response_bucket(avg_response_time_secs: u64, blend: &PerformanceBlend) -> f64 {
    if avg_response_time_secs <= blend.fast_response_secs {
        blend.fast_score
    } else if avg_response_time_secs <= blend.medium_response_secs {
        blend.medium_score
    } else {
        blend.slow_score
    }
}

pub fn performance_score(agent: &Agent, blend: &PerformanceBlend) -> f64 {
    let rating = clamp_unit(agent.rating / 5.0);
    let conversion = clamp_unit(agent.conversion_rate);
    let response = clamp_unit(response_bucket(agent.avg_response_time_secs, blend));

    let total_weight = blend.rating_weight + blend.conversion_weight + blend.response_weight;
    if total_weight <= 0.0 {
        return 0.0;
    }

    clamp_unit(
        (rating * blend.rating_weight
            + conversion * blend.conversion_weight
            + response * blend.response_weight)
            / total_weight,
    )
}

/// Spare capacity, `max(0, 1 - current/max)`. Zero capacity scores 0.
pub fn workload_score(agent: &Agent) -> f64 {
    if agent.max_lead_capacity == 0 || agent.is_at_capacity() {
        return 0.0;
    }
    let utilization = agent.current_lead_count as f64 / agent.max_lead_capacity as f64;
    (1.0 - utilization).max(0.0)
}

pub fn lead_tier(lead: &Lead) -> Tier {
    match lead.quality_score {
        Some(score) if score >= 70.0 => Tier::High,
        Some(score) if score >= 40.0 => Tier::Medium,
        Some(_) => Tier::Low,
        None => match lead.priority {
            LeadPriority::High => Tier::High,
            LeadPriority::Medium => Tier::Medium,
            LeadPriority::Low => Tier::Low,
        },
    }
}

pub fn agent_tier(agent: &Agent) -> Tier {
    if agent.rating >= 4.5 {
        Tier::High
    } else if agent.rating >= 3.5 {
        Tier::Medium
    } else {
        Tier::Low
    }
}

pub fn quality_tier_score(lead: &Lead, agent: &Agent) -> f64 {
    let required = lead_tier(lead) as i32;
    let offered = agent_tier(agent) as i32;
    match required - offered {
        gap if gap <= 0 => 1.0,
        1 => 0.5,
        _ => 0.0,
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
