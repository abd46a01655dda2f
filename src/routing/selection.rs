//! Candidate selection against the confidence threshold.

use std::collections::HashSet;

use crate::model::RankedAgent;

/// Result of filtering a ranking down to assignable agents.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Agents clearing the threshold, best first, at most `slots` long
    Qualified(Vec<RankedAgent>),
    /// Nobody cleared the threshold; carries the best eligible agent
    BelowThreshold(RankedAgent),
    /// Every candidate is at capacity or already holds the lead
    NoEligible,
}

/// Pick up to `slots` agents from `ranked` (already in ranking order).
///
/// Ineligible agents and agents in `pending` are never selected.
pub fn select(
    ranked: &[RankedAgent],
    pending: &HashSet<&str>,
    slots: usize,
    min_confidence: f64,
) -> Selection {
    let mut assignable = ranked
        .iter()
        .filter(|r| r.eligible && !pending.contains(r.agent_id.as_str()))
        .peekable();

    let Some(best) = assignable.peek().map(|r| (*r).clone()) else {
        return Selection::NoEligible;
    };

    let qualified: Vec<RankedAgent> = assignable
        .filter(|r| r.confidence >= min_confidence)
        .take(slots)
        .cloned()
        .collect();

    if qualified.is_empty() {
        Selection::BelowThreshold(best)
    } else {
        Selection::Qualified(qualified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RoutingFactors;

    fn ranked(id: &str, score: f64, eligible: bool) -> RankedAgent {
        RankedAgent {
            agent_id: id.to_string(),
            score,
            confidence: score / 100.0,
            factors: RoutingFactors::default(),
            eligible,
        }
    }

    #[test]
    fn takes_qualified_agents_up_to_slots() {
        let list = vec![
            ranked("A", 90.0, true),
            ranked("B", 80.0, true),
            ranked("C", 75.0, true),
            ranked("D", 50.0, true),
        ];
        match select(&list, &HashSet::new(), 2, 0.7) {
            Selection::Qualified(agents) => {
                let ids: Vec<_> = agents.iter().map(|a| a.agent_id.as_str()).collect();
                assert_eq!(ids, vec!["A", "B"]);
            }
            other => panic!("Expected Qualified, got {:?}", other),
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let list = vec![ranked("A", 70.0, true)];
        assert!(matches!(
            select(&list, &HashSet::new(), 3, 0.7),
            Selection::Qualified(_)
        ));
    }

    #[test]
    fn skips_ineligible_and_pending() {
        let list = vec![
            ranked("full", 99.0, false),
            ranked("pending", 95.0, true),
            ranked("ok", 85.0, true),
        ];
        let pending: HashSet<&str> = ["pending"].into_iter().collect();
        match select(&list, &pending, 3, 0.7) {
            Selection::Qualified(agents) => {
                assert_eq!(agents.len(), 1);
                assert_eq!(agents[0].agent_id, "ok");
            }
            other => panic!("Expected Qualified, got {:?}", other),
        }
    }

    #[test]
    fn below_threshold_returns_best_eligible() {
        let list = vec![
            ranked("full", 65.0, false),
            ranked("B", 60.0, true),
            ranked("C", 40.0, true),
        ];
        assert_eq!(
            select(&list, &HashSet::new(), 3, 0.7),
            Selection::BelowThreshold(ranked("B", 60.0, true))
        );
    }

    #[test]
    fn nothing_assignable() {
        let list = vec![ranked("full", 95.0, false)];
        assert_eq!(select(&list, &HashSet::new(), 3, 0.7), Selection::NoEligible);
        assert_eq!(select(&[], &HashSet::new(), 3, 0.7), Selection::NoEligible);
    }
}
