//! Configuration for the lead router
//!
//! Layered loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`LEADROUTER_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use leadrouter::config::RouterConfig;
//!
//! let config = RouterConfig::default();
//! assert_eq!(config.routing.max_agents_per_lead, 3);
//!
//! let toml = r#"
//! [routing]
//! min_confidence_threshold = 0.8
//! "#;
//! let config: RouterConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.routing.min_confidence_threshold, 0.8);
//! ```

pub mod error;
pub mod logging;
pub mod ranking;
pub mod routing;
pub mod server;
pub mod sweeper;
pub mod transport;

pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use ranking::RankingConfig;
pub use routing::{BelowThresholdPolicy, RoutingConfig};
pub use server::ServerConfig;
pub use sweeper::SweeperConfig;
pub use transport::TransportConfig;

// Breaker thresholds live next to the breaker itself
pub use crate::breaker::{BreakerConfig, BreakerOverride, BreakerSettings};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for the router process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub server: ServerConfig,
    pub transport: TransportConfig,
    pub routing: RoutingConfig,
    pub ranking: RankingConfig,
    pub breaker: BreakerSettings,
    pub sweeper: SweeperConfig,
    pub logging: LoggingConfig,
}

impl RouterConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply `LEADROUTER_*` environment overrides.
    ///
    /// Values that fail to parse are ignored and the previous value is kept.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("LEADROUTER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse("LEADROUTER_PORT") {
            self.server.port = port;
        }

        if let Ok(level) = std::env::var("LEADROUTER_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = env_parse("LEADROUTER_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Ok(url) = std::env::var("LEADROUTER_BUS_URL") {
            self.transport.bus_url = url;
        }

        if let Some(threshold) = env_parse("LEADROUTER_MIN_CONFIDENCE") {
            self.routing.min_confidence_threshold = threshold;
        }
        if let Some(max) = env_parse("LEADROUTER_MAX_AGENTS_PER_LEAD") {
            self.routing.max_agents_per_lead = max;
        }
        if let Some(policy) = env_parse("LEADROUTER_BELOW_THRESHOLD_POLICY") {
            self.routing.below_threshold_policy = policy;
        }

        if let Some(timeout) = env_parse("LEADROUTER_ESCALATION_TIMEOUT_MS") {
            self.sweeper.escalation_timeout_ms = timeout;
        }
        if let Ok(sweeper) = std::env::var("LEADROUTER_SWEEPER") {
            match sweeper.to_lowercase().as_str() {
                "true" | "1" | "on" => self.sweeper.enabled = true,
                "false" | "0" | "off" => self.sweeper.enabled = false,
                _ => {}
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "port must be non-zero"));
        }
        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "server.request_timeout_seconds",
                "timeout must be non-zero",
            ));
        }

        if self.transport.bus_url.trim().is_empty() {
            return Err(ConfigError::invalid(
                "transport.bus_url",
                "URL cannot be empty",
            ));
        }
        if self.transport.request_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "transport.request_timeout_ms",
                "timeout must be non-zero",
            ));
        }
        if self.transport.notification_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "transport.notification_timeout_ms",
                "timeout must be non-zero",
            ));
        }
        if self.transport.retry.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "transport.retry.max_attempts",
                "at least one attempt is required",
            ));
        }

        let threshold = self.routing.min_confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::invalid(
                "routing.min_confidence_threshold",
                format!("must be within [0, 1], got {}", threshold),
            ));
        }
        if self.routing.max_agents_per_lead == 0 {
            return Err(ConfigError::invalid(
                "routing.max_agents_per_lead",
                "must be at least 1",
            ));
        }
        if self.routing.candidate_pool_size == 0 {
            return Err(ConfigError::invalid(
                "routing.candidate_pool_size",
                "must be at least 1",
            ));
        }

        self.ranking
            .weights
            .validate()
            .map_err(|message| ConfigError::invalid("ranking.weights", message))?;
        let credit = self.ranking.partial_specialization_credit;
        if !(0.0..=1.0).contains(&credit) {
            return Err(ConfigError::invalid(
                "ranking.partial_specialization_credit",
                format!("must be within [0, 1], got {}", credit),
            ));
        }
        let penalty = self.ranking.history_penalty;
        if !penalty.is_finite() || penalty < 0.0 {
            return Err(ConfigError::invalid(
                "ranking.history_penalty",
                "must be non-negative",
            ));
        }

        for (id, breaker) in self.breaker.all() {
            let field = |name: &str| {
                if id == "default" {
                    format!("breaker.{}", name)
                } else {
                    format!("breaker.services.{}.{}", id, name)
                }
            };
            if breaker.failure_threshold == 0 {
                return Err(ConfigError::invalid(
                    field("failure_threshold"),
                    "must be at least 1",
                ));
            }
            if breaker.success_threshold == 0 {
                return Err(ConfigError::invalid(
                    field("success_threshold"),
                    "must be at least 1",
                ));
            }
            if breaker.cooldown_ms == 0 {
                return Err(ConfigError::invalid(field("cooldown_ms"), "must be non-zero"));
            }
        }

        if self.sweeper.interval_seconds == 0 {
            return Err(ConfigError::invalid(
                "sweeper.interval_seconds",
                "must be non-zero",
            ));
        }
        if self.sweeper.escalation_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "sweeper.escalation_timeout_ms",
                "must be non-zero",
            ));
        }
        if self.sweeper.batch_size == 0 || self.sweeper.concurrency == 0 {
            return Err(ConfigError::invalid(
                "sweeper",
                "batch_size and concurrency must be at least 1",
            ));
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
