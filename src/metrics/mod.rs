//! # Metrics
//!
//! Prometheus export for the routing engine.
//!
//! **Counters:**
//! - `leadrouter_routing_attempts_total{outcome}` - Terminal status per routing attempt
//! - `leadrouter_assignments_total{result}` - Commits: created, existing, failed
//! - `leadrouter_below_threshold_total` - Attempts where nobody cleared the threshold
//! - `leadrouter_publish_failures_total{topic}` - Notifications and decisions that were lost
//! - `leadrouter_sweeper_leads_total{action}` - Sweeper outcome per stale lead
//!
//! **Histograms:**
//! - `leadrouter_routing_duration_seconds` - Wall time of one routing attempt
//!
//! **Gauges:**
//! - `leadrouter_breaker_state{service}` - 0 closed, 1 half-open, 2 open
//! - `leadrouter_history_agents` - Agents with assignments in the history window

pub mod handler;

pub use metrics_exporter_prometheus::PrometheusBuilder;

use crate::breaker::CircuitBreakerRegistry;
use crate::routing::RoutingHistory;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

/// Renders the Prometheus exposition and refreshes derived gauges.
pub struct MetricsCollector {
    breakers: Arc<CircuitBreakerRegistry>,
    history: Arc<RoutingHistory>,
    start_time: Instant,
    prometheus_handle: PrometheusHandle,
}

impl MetricsCollector {
    pub fn new(
        breakers: Arc<CircuitBreakerRegistry>,
        history: Arc<RoutingHistory>,
        start_time: Instant,
        prometheus_handle: PrometheusHandle,
    ) -> Self {
        Self {
            breakers,
            history,
            start_time,
            prometheus_handle,
        }
    }

    /// Re-publish gauges derived from in-process state.
    ///
    /// Breaker gauges are also set on every transition; refreshing here
    /// covers breakers that changed before the recorder was installed.
    pub fn update_gauges(&self) {
        for snapshot in self.breakers.snapshot() {
            metrics::gauge!("leadrouter_breaker_state", "service" => snapshot.service_id)
                .set(snapshot.state.gauge_value());
        }

        self.history.prune();
        metrics::gauge!("leadrouter_history_agents").set(self.history.agent_count() as f64);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn render_metrics(&self) -> String {
        self.prometheus_handle.render()
    }
}

/// Install the global Prometheus recorder.
///
/// Routing duration buckets run from 5ms to 30s: an attempt is a handful of
/// bus round trips, each bounded by the request timeout.
pub fn setup_metrics() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    use metrics_exporter_prometheus::Matcher;

    let duration_buckets = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("leadrouter_routing_duration_seconds".to_string()),
            duration_buckets,
        )?
        .install_recorder()?;

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::BreakerSettings;
    use std::sync::{Mutex, Once};

    static INIT: Once = Once::new();
    static TEST_HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

    fn get_test_handle() -> PrometheusHandle {
        INIT.call_once(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            *TEST_HANDLE.lock().unwrap() = Some(handle);
            metrics::set_global_recorder(Box::new(recorder)).ok();
        });

        TEST_HANDLE.lock().unwrap().as_ref().unwrap().clone()
    }

    fn collector() -> MetricsCollector {
        MetricsCollector::new(
            Arc::new(CircuitBreakerRegistry::new(BreakerSettings::default())),
            Arc::new(RoutingHistory::default()),
            Instant::now(),
            get_test_handle(),
        )
    }

    #[test]
    fn test_metrics_collector_construction() {
        let collector = collector();
        assert!(collector.uptime_seconds() < 1);
    }

    #[test]
    fn test_update_gauges_does_not_panic_without_breakers() {
        let collector = collector();
        collector.update_gauges();
        // Render never fails, even when the global recorder belongs to another test
        let _ = collector.render_metrics();
    }
}
