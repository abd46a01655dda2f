//! Health and readiness endpoint handlers.

use crate::api::AppState;
use crate::breaker::{BreakerSnapshot, CircuitState, DATA_SERVICE};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub breakers: Vec<BreakerSnapshot>,
    pub routing_history: HistoryStats,
    pub subscriptions: Vec<String>,
}

/// Size of the in-process routing history window.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryStats {
    pub agents: usize,
    pub assignments: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadyResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// `unhealthy` when the data service is cut off, `degraded` when any other
/// breaker is not closed.
fn overall_status(breakers: &[BreakerSnapshot]) -> &'static str {
    let data_open = breakers
        .iter()
        .any(|b| b.service_id == DATA_SERVICE && b.state == CircuitState::Open);
    if data_open {
        "unhealthy"
    } else if breakers.iter().any(|b| b.state != CircuitState::Closed) {
        "degraded"
    } else {
        "healthy"
    }
}

/// GET /health - Return system health status.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let breakers = state.breakers.snapshot();
    let history = state.orchestrator.history();
    history.prune();

    Json(HealthResponse {
        status: overall_status(&breakers).to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        breakers,
        routing_history: HistoryStats {
            agents: history.agent_count(),
            assignments: history.len(),
        },
        subscriptions: state.inbox.topics(),
    })
}

/// GET /ready - 503 while routing cannot reach the data service.
pub async fn ready(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadyResponse>) {
    if state.breakers.is_open(DATA_SERVICE) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                reason: Some(format!("{} circuit is open", DATA_SERVICE)),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadyResponse {
            ready: true,
            reason: None,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(service_id: &str, state: CircuitState) -> BreakerSnapshot {
        BreakerSnapshot {
            service_id: service_id.to_string(),
            state,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_failure_at: None,
            last_probe_at: None,
        }
    }

    #[test]
    fn test_status_healthy_without_breakers() {
        assert_eq!(overall_status(&[]), "healthy");
    }

    #[test]
    fn test_status_degraded_when_notifications_open() {
        let breakers = vec![
            snapshot(DATA_SERVICE, CircuitState::Closed),
            snapshot("notificationService", CircuitState::Open),
        ];
        assert_eq!(overall_status(&breakers), "degraded");
    }

    #[test]
    fn test_status_degraded_while_data_service_probes() {
        let breakers = vec![snapshot(DATA_SERVICE, CircuitState::HalfOpen)];
        assert_eq!(overall_status(&breakers), "degraded");
    }

    #[test]
    fn test_status_unhealthy_when_data_service_open() {
        let breakers = vec![snapshot(DATA_SERVICE, CircuitState::Open)];
        assert_eq!(overall_status(&breakers), "unhealthy");
    }
}
