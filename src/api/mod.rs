//! # HTTP surface
//!
//! Operational endpoints plus the inbound side of the HTTP bus adapter.
//!
//! ## Endpoints
//!
//! - `GET /health` - Breaker states, uptime and routing-history size
//! - `GET /ready` - 503 while the data-service breaker is open
//! - `GET /metrics` - Prometheus exposition
//! - `POST /v1/events/:topic` - Deliver a bus event to the local subscriber
//!
//! ## Example
//!
//! ```no_run
//! use leadrouter::api::{create_router, AppState};
//! use leadrouter::config::RouterConfig;
//! use leadrouter::transport::InMemoryBus;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = Arc::new(InMemoryBus::new());
//! let state = Arc::new(AppState::new(bus, Arc::new(RouterConfig::default())));
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! Error bodies use the same envelope as bus replies:
//! ```json
//! { "error": { "code": "no_subscriber", "message": "No subscriber for topic 'x'" } }
//! ```

mod error;
mod events;
mod health;

pub use error::ApiError;
pub use events::EventAck;
pub use health::{HealthResponse, HistoryStats, ReadyResponse};

use crate::breaker::CircuitBreakerRegistry;
use crate::config::RouterConfig;
use crate::metrics::MetricsCollector;
use crate::routing::Orchestrator;
use crate::transport::{Inbox, MessageBus};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: Arc<RouterConfig>,
    pub orchestrator: Arc<Orchestrator>,
    pub breakers: Arc<CircuitBreakerRegistry>,
    /// Subscriptions of the bus this process consumes from
    pub inbox: Arc<Inbox>,
    pub start_time: Instant,
    pub metrics_collector: Arc<MetricsCollector>,
}

impl AppState {
    /// Build breakers and the orchestrator on top of `bus`.
    pub fn new(bus: Arc<dyn MessageBus>, config: Arc<RouterConfig>) -> Self {
        let breakers = Arc::new(CircuitBreakerRegistry::new(config.breaker.clone()));
        let orchestrator = Arc::new(Orchestrator::from_config(
            Arc::clone(&bus),
            Arc::clone(&breakers),
            &config,
        ));
        Self::with_components(bus.inbox(), orchestrator, breakers, config)
    }

    pub fn with_components(
        inbox: Arc<Inbox>,
        orchestrator: Arc<Orchestrator>,
        breakers: Arc<CircuitBreakerRegistry>,
        config: Arc<RouterConfig>,
    ) -> Self {
        let start_time = Instant::now();

        // A second install fails (tests, embedding); fall back to a detached handle
        let prometheus_handle = crate::metrics::setup_metrics().unwrap_or_else(|e| {
            tracing::debug!("Metrics already initialized, creating new handle: {}", e);
            crate::metrics::PrometheusBuilder::new()
                .build_recorder()
                .handle()
        });

        let metrics_collector = Arc::new(MetricsCollector::new(
            Arc::clone(&breakers),
            Arc::clone(orchestrator.history()),
            start_time,
            prometheus_handle,
        ));

        Self {
            config,
            orchestrator,
            breakers,
            inbox,
            start_time,
            metrics_collector,
        }
    }
}

/// Create the router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_body = state.config.server.max_body_bytes;
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);

    Router::new()
        .route("/health", get(health::handle))
        .route("/ready", get(health::ready))
        .route("/metrics", get(crate::metrics::handler::metrics_handler))
        .route("/v1/events/:topic", post(events::handle))
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
