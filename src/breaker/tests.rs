//! Unit tests for the circuit breaker.

use super::*;
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn unavailable() -> TransportError {
    TransportError::Unavailable {
        topic: "lead.get".to_string(),
        message: "connection refused".to_string(),
    }
}

fn rejected() -> TransportError {
    TransportError::Rejected {
        topic: "lead.get".to_string(),
        code: "not_found".to_string(),
        message: "no such lead".to_string(),
    }
}

fn registry_with(
    failure_threshold: u32,
    cooldown_ms: u64,
    success_threshold: u32,
) -> CircuitBreakerRegistry {
    CircuitBreakerRegistry::new(BreakerSettings {
        defaults: BreakerConfig {
            failure_threshold,
            cooldown_ms,
            success_threshold,
        },
        ..BreakerSettings::default()
    })
}

async fn fail(registry: &CircuitBreakerRegistry, service: &str) -> Result<(), BreakerError> {
    registry
        .execute(service, || async { Err::<(), _>(unavailable()) })
        .await
}

async fn succeed(registry: &CircuitBreakerRegistry, service: &str) -> Result<(), BreakerError> {
    registry.execute(service, || async { Ok(()) }).await
}

// ============================================================================
// State machine
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_opens_after_consecutive_failures() {
    let registry = registry_with(3, 30_000, 2);

    for _ in 0..2 {
        assert!(matches!(
            fail(&registry, DATA_SERVICE).await,
            Err(BreakerError::Call(_))
        ));
        assert_eq!(registry.state_of(DATA_SERVICE), CircuitState::Closed);
    }

    fail(&registry, DATA_SERVICE).await.unwrap_err();
    assert_eq!(registry.state_of(DATA_SERVICE), CircuitState::Open);
    assert!(registry.is_open(DATA_SERVICE));
}

#[tokio::test(start_paused = true)]
async fn test_open_breaker_fails_fast_without_calling() {
    let registry = registry_with(1, 30_000, 1);
    fail(&registry, DATA_SERVICE).await.unwrap_err();

    let calls = AtomicUsize::new(0);
    let result = registry
        .execute(DATA_SERVICE, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

    assert_eq!(
        result,
        Err(BreakerError::Open {
            service: DATA_SERVICE.to_string()
        })
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_non_counting_errors_do_not_trip() {
    let registry = registry_with(2, 30_000, 1);

    for _ in 0..5 {
        let result = registry
            .execute(DATA_SERVICE, || async { Err::<(), _>(rejected()) })
            .await;
        assert_eq!(result, Err(BreakerError::Call(rejected())));
    }

    assert_eq!(registry.state_of(DATA_SERVICE), CircuitState::Closed);
    assert_eq!(registry.snapshot()[0].consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_success_resets_failure_count() {
    let registry = registry_with(3, 30_000, 1);

    fail(&registry, DATA_SERVICE).await.unwrap_err();
    fail(&registry, DATA_SERVICE).await.unwrap_err();
    succeed(&registry, DATA_SERVICE).await.unwrap();
    fail(&registry, DATA_SERVICE).await.unwrap_err();
    fail(&registry, DATA_SERVICE).await.unwrap_err();

    assert_eq!(registry.state_of(DATA_SERVICE), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_half_open_after_cooldown_then_closes() {
    let registry = registry_with(1, 30_000, 2);
    fail(&registry, DATA_SERVICE).await.unwrap_err();

    tokio::time::advance(Duration::from_secs(29)).await;
    assert!(succeed(&registry, DATA_SERVICE).await.unwrap_err().is_open());

    tokio::time::advance(Duration::from_secs(1)).await;
    succeed(&registry, DATA_SERVICE).await.unwrap();
    assert_eq!(registry.state_of(DATA_SERVICE), CircuitState::HalfOpen);
    assert_eq!(registry.snapshot()[0].consecutive_successes, 1);
    assert!(registry.snapshot()[0].last_probe_at.is_some());

    succeed(&registry, DATA_SERVICE).await.unwrap();
    assert_eq!(registry.state_of(DATA_SERVICE), CircuitState::Closed);
    assert_eq!(registry.snapshot()[0].consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_probe_failure_reopens() {
    let registry = registry_with(1, 1_000, 2);
    fail(&registry, DATA_SERVICE).await.unwrap_err();

    tokio::time::advance(Duration::from_millis(1_000)).await;
    assert!(matches!(
        fail(&registry, DATA_SERVICE).await,
        Err(BreakerError::Call(_))
    ));
    assert_eq!(registry.state_of(DATA_SERVICE), CircuitState::Open);

    // Cooldown restarts from the failed probe
    tokio::time::advance(Duration::from_millis(500)).await;
    assert!(succeed(&registry, DATA_SERVICE).await.unwrap_err().is_open());
}

#[tokio::test(start_paused = true)]
async fn test_neutral_probe_result_keeps_half_open() {
    let registry = registry_with(1, 1_000, 1);
    fail(&registry, DATA_SERVICE).await.unwrap_err();
    tokio::time::advance(Duration::from_millis(1_000)).await;

    let result = registry
        .execute(DATA_SERVICE, || async { Err::<(), _>(rejected()) })
        .await;
    assert!(matches!(result, Err(BreakerError::Call(_))));
    assert_eq!(registry.state_of(DATA_SERVICE), CircuitState::HalfOpen);

    // Probe slot was released
    succeed(&registry, DATA_SERVICE).await.unwrap();
    assert_eq!(registry.state_of(DATA_SERVICE), CircuitState::Closed);
}

// ============================================================================
// Probe exclusivity
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_only_one_probe_in_flight() {
    let registry = Arc::new(registry_with(1, 1_000, 1));
    fail(&registry, DATA_SERVICE).await.unwrap_err();
    tokio::time::advance(Duration::from_millis(1_000)).await;

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let probe = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            registry
                .execute(DATA_SERVICE, || async move {
                    let _ = rx.await;
                    Ok(())
                })
                .await
        })
    };
    tokio::task::yield_now().await;

    assert!(succeed(&registry, DATA_SERVICE).await.unwrap_err().is_open());

    tx.send(()).unwrap();
    probe.await.unwrap().unwrap();
    assert_eq!(registry.state_of(DATA_SERVICE), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_probe_releases_slot() {
    let registry = registry_with(1, 1_000, 1);
    fail(&registry, DATA_SERVICE).await.unwrap_err();
    tokio::time::advance(Duration::from_millis(1_000)).await;

    // Poll once so the probe is admitted, then drop it mid-call
    let pending = registry
        .execute(DATA_SERVICE, || futures::future::pending::<Result<(), TransportError>>())
        .now_or_never();
    assert!(pending.is_none());

    succeed(&registry, DATA_SERVICE).await.unwrap();
    assert_eq!(registry.state_of(DATA_SERVICE), CircuitState::Closed);
}

// ============================================================================
// Per-service isolation and reporting
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_services_are_independent() {
    let registry = registry_with(1, 30_000, 1);
    fail(&registry, NOTIFICATION_SERVICE).await.unwrap_err();

    assert!(registry.is_open(NOTIFICATION_SERVICE));
    succeed(&registry, DATA_SERVICE).await.unwrap();
    assert_eq!(registry.state_of(DATA_SERVICE), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_per_service_thresholds() {
    let mut settings = BreakerSettings::default();
    settings.services.insert(
        NOTIFICATION_SERVICE.to_string(),
        BreakerOverride {
            failure_threshold: Some(1),
            ..BreakerOverride::default()
        },
    );
    let registry = CircuitBreakerRegistry::new(settings);

    fail(&registry, NOTIFICATION_SERVICE).await.unwrap_err();
    fail(&registry, DATA_SERVICE).await.unwrap_err();

    assert!(registry.is_open(NOTIFICATION_SERVICE));
    assert!(!registry.is_open(DATA_SERVICE));
}

#[tokio::test]
async fn test_snapshot_sorted_by_service() {
    let registry = CircuitBreakerRegistry::default();
    succeed(&registry, NOTIFICATION_SERVICE).await.unwrap();
    succeed(&registry, ANALYTICS_SERVICE).await.unwrap();
    succeed(&registry, DATA_SERVICE).await.unwrap();

    let ids: Vec<String> = registry
        .snapshot()
        .into_iter()
        .map(|s| s.service_id)
        .collect();
    assert_eq!(ids, vec![ANALYTICS_SERVICE, DATA_SERVICE, NOTIFICATION_SERVICE]);
}

#[test]
fn test_unknown_service_is_closed() {
    let registry = CircuitBreakerRegistry::default();
    assert_eq!(registry.state_of("nope"), CircuitState::Closed);
    assert!(registry.snapshot().is_empty());
}

#[test]
fn test_snapshot_serializes_camel_case() {
    let snapshot = BreakerState::default().snapshot(DATA_SERVICE);
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["serviceId"], DATA_SERVICE);
    assert_eq!(json["state"], "closed");
    assert_eq!(json["consecutiveFailures"], 0);
}

#[test]
fn test_gauge_values() {
    assert_eq!(CircuitState::Closed.gauge_value(), 0.0);
    assert_eq!(CircuitState::HalfOpen.gauge_value(), 1.0);
    assert_eq!(CircuitState::Open.gauge_value(), 2.0);
}
