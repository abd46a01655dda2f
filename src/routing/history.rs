//! Per-agent routing history
//!
//! Rolling window of assignment timestamps per agent, kept in memory only.
//! Each agent's window sits behind its own map entry so recording for one
//! agent never blocks readers of another.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::{HashMap, VecDeque};

/// Rolling assignment history (default window 24h)
#[derive(Debug)]
pub struct RoutingHistory {
    window: Duration,
    entries: DashMap<String, VecDeque<DateTime<Utc>>>,
}

impl RoutingHistory {
    pub fn new(window_hours: u64) -> Self {
        Self {
            window: Duration::hours(window_hours.min(i32::MAX as u64) as i64),
            entries: DashMap::new(),
        }
    }

    /// Record an assignment for `agent_id` now
    pub fn record(&self, agent_id: &str) {
        self.record_at(agent_id, Utc::now());
    }

    pub fn record_at(&self, agent_id: &str, at: DateTime<Utc>) {
        let cutoff = Utc::now() - self.window;
        let mut window = self.entries.entry(agent_id.to_string()).or_default();
        while window.front().is_some_and(|t| *t < cutoff) {
            window.pop_front();
        }
        // Keep the deque ordered even if callers pass older timestamps
        let pos = window.partition_point(|t| *t <= at);
        window.insert(pos, at);
    }

    /// Assignments for `agent_id` inside the window
    pub fn recent_count(&self, agent_id: &str) -> u32 {
        let cutoff = Utc::now() - self.window;
        self.entries
            .get(agent_id)
            .map(|w| w.iter().filter(|t| **t >= cutoff).count() as u32)
            .unwrap_or(0)
    }

    /// Recent counts for a candidate set; agents without history are omitted
    pub fn recent_counts<'a>(
        &self,
        agent_ids: impl IntoIterator<Item = &'a str>,
    ) -> HashMap<String, u32> {
        agent_ids
            .into_iter()
            .filter_map(|id| {
                let count = self.recent_count(id);
                (count > 0).then(|| (id.to_string(), count))
            })
            .collect()
    }

    /// Drop expired timestamps and empty windows
    pub fn prune(&self) {
        let cutoff = Utc::now() - self.window;
        self.entries.retain(|_, window| {
            while window.front().is_some_and(|t| *t < cutoff) {
                window.pop_front();
            }
            !window.is_empty()
        });
    }

    /// Total timestamps held across all agents
    pub fn len(&self) -> usize {
        self.entries.iter().map(|w| w.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of agents with at least one entry
    pub fn agent_count(&self) -> usize {
        self.entries.len()
    }
}

impl Default for RoutingHistory {
    fn default() -> Self {
        Self::new(24)
    }
}
