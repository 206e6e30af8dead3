//! Podbridge Agent - deployment unit to pod bridge
//!
//! This binary receives deployment unit events from the source platform,
//! translates them into pods and applies them to the local cluster.

use anyhow::{Context, Result};
use bridge_lib::{
    apply::{KubeApplier, PodApplier, RecordingApplier},
    events::{EventRouter, RouterConfig, SyncHandler},
    health::{components, HealthRegistry},
    observability::{BridgeMetrics, StructuredLogger},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting podbridge-agent");

    let config = config::AgentConfig::load()?;
    info!(
        node_name = %config.node_name,
        namespace = %config.namespace,
        dry_run = config.dry_run,
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::ROUTER).await;
    health_registry.register(components::APPLIER).await;

    let metrics = BridgeMetrics::new();
    let logger = StructuredLogger::new(&config.node_name);
    logger.log_startup(AGENT_VERSION, config.worker_count);

    let applier: Arc<dyn PodApplier> = if config.dry_run {
        warn!("Dry run: pods are recorded, not applied");
        Arc::new(RecordingApplier::new())
    } else {
        Arc::new(
            KubeApplier::try_default(config.field_manager.clone())
                .await
                .context("Failed to create Kubernetes client")?,
        )
    };

    let handler = SyncHandler::new(
        applier,
        config.namespace.clone(),
        health_registry.clone(),
        metrics.clone(),
        logger.clone(),
    );
    let router = EventRouter::new(
        Arc::new(handler),
        RouterConfig {
            worker_count: config.worker_count,
        },
        metrics.clone(),
        logger.clone(),
    );

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        router.clone(),
        config.namespace.clone(),
    ));

    health_registry.set_ready(true).await;

    let mut api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            logger.log_shutdown("SIGINT received");
        }
        result = &mut api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
        }
    }

    // Stop intake, then let events already answered with 202 finish
    health_registry.set_ready(false).await;
    api_handle.abort();

    let timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let unfinished = router.drain(timeout).await;
    if unfinished > 0 {
        warn!(unfinished, timeout_secs = config.shutdown_timeout_secs, "Events still running at shutdown");
    }
    router.close();
    info!("Shutting down");

    Ok(())
}
