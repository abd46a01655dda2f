//! Serve command implementation

use crate::api::{create_router, AppState};
use crate::cli::ServeArgs;
use crate::config::RouterConfig;
use crate::logging::init_tracing;
use crate::routing::RoutingConsumer;
use crate::sweeper::StaleLeadSweeper;
use crate::transport::topics::NEEDS_ROUTING;
use crate::transport::{HttpBus, MessageBus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(
    args: &ServeArgs,
) -> Result<RouterConfig, Box<dyn std::error::Error>> {
    let mut config = if args.config.exists() {
        RouterConfig::load(Some(&args.config))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        RouterConfig::default()
    };

    config = config.with_env_overrides();

    // CLI flags win over everything else
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }
    if let Some(ref bus_url) = args.bus_url {
        config.transport.bus_url = bus_url.clone();
    }
    if args.no_sweeper {
        config.sweeper.enabled = false;
    }

    Ok(config)
}

/// Build API router with all endpoints
fn build_api_router(
    bus: Arc<dyn MessageBus>,
    config: Arc<RouterConfig>,
) -> (axum::Router, Arc<AppState>) {
    let app_state = Arc::new(AppState::new(bus, config));
    let router = create_router(Arc::clone(&app_state));
    (router, app_state)
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }

    cancel_token.cancel();
}

/// Main serve command handler
pub async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    init_tracing(&config.logging)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting leadrouter");
    tracing::debug!(?config, "Loaded configuration");

    let bus: Arc<dyn MessageBus> = Arc::new(HttpBus::new(&config.transport)?);
    let config = Arc::new(config);
    let (app, app_state) = build_api_router(Arc::clone(&bus), Arc::clone(&config));

    bus.subscribe(
        NEEDS_ROUTING,
        Arc::new(RoutingConsumer::new(Arc::clone(&app_state.orchestrator))),
    )?;
    tracing::info!(
        topic = NEEDS_ROUTING,
        bus_url = %config.transport.bus_url,
        "Subscribed to routing events"
    );

    let cancel_token = CancellationToken::new();
    let sweeper_handle = if config.sweeper.enabled {
        let sweeper = StaleLeadSweeper::new(
            Arc::clone(&app_state.orchestrator),
            config.sweeper.clone(),
        );
        Some(sweeper.start(cancel_token.clone()))
    } else {
        tracing::info!("Stale-lead sweeper disabled");
        None
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %addr, "leadrouter listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token.clone()))
        .await?;

    if let Some(handle) = sweeper_handle {
        tracing::info!("Waiting for sweeper to stop");
        handle.await?;
    }

    tracing::info!("leadrouter stopped");
    Ok(())
}
