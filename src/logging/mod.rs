//! Tracing setup
//!
//! Builds the `EnvFilter` directives from `[logging]` and installs the
//! subscriber in either pretty or JSON form.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build filter directives string from LoggingConfig
///
/// The base level comes first, followed by one `leadrouter::<component>=<level>`
/// directive per configured component, in component order.
///
/// ```
/// use leadrouter::config::LoggingConfig;
/// use leadrouter::logging::build_filter_directives;
///
/// let mut config = LoggingConfig::default();
/// config.component_levels.insert("breaker".to_string(), "debug".to_string());
///
/// assert_eq!(build_filter_directives(&config), "info,leadrouter::breaker=debug");
/// ```
pub fn build_filter_directives(config: &LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    for (component, level) in &config.component_levels {
        filter_str.push_str(&format!(",leadrouter::{}={}", component, level));
    }

    filter_str
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the config.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives_base_level_only() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(build_filter_directives(&config), "warn");
    }

    #[test]
    fn test_filter_directives_components_sorted() {
        let mut config = LoggingConfig::default();
        config
            .component_levels
            .insert("sweeper".to_string(), "trace".to_string());
        config
            .component_levels
            .insert("breaker".to_string(), "debug".to_string());

        assert_eq!(
            build_filter_directives(&config),
            "info,leadrouter::breaker=debug,leadrouter::sweeper=trace"
        );
    }

    #[test]
    fn test_filter_directives_parse_as_env_filter() {
        let mut config = LoggingConfig::default();
        config
            .component_levels
            .insert("routing".to_string(), "debug".to_string());
        assert!(EnvFilter::try_new(build_filter_directives(&config)).is_ok());
    }
}
