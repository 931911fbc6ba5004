//! Triage Agent - incident triage decision service
//!
//! Receives health signals over HTTP, scores them, and raises alerts and
//! auto-heal runbooks for at-risk resources.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use triage_agent::{api, config::AgentConfig};
use triage_lib::{DecisionEngine, HealthRegistry};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting triage-agent");

    let config = AgentConfig::load()?;
    let engine_config = config.engine_config();
    let alert_sink = config.alert_sink()?;
    info!(
        instance = %config.instance_name,
        risk_table = %engine_config.risk_table,
        alerting = alert_sink.is_some(),
        dry_run = config.executor_endpoint.is_none(),
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;

    let mut builder = DecisionEngine::builder()
        .config(engine_config.clone())
        .store(config.open_store().await)
        .executor(config.executor()?)
        .health(health_registry.clone())
        .instance(&config.instance_name);
    if let Some(sink) = alert_sink {
        builder = builder.alert_sink(sink);
    }
    let engine = Arc::new(builder.build().context("failed to build decision engine")?);

    let logger = engine.logger().clone();
    logger.log_startup(
        AGENT_VERSION,
        &engine_config.risk_threshold.to_string(),
        engine_config.cooldown_seconds,
    );

    let app_state = Arc::new(api::AppState::new(engine));

    // Mark agent as ready after initialization
    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    return Err(e);
                }
                Err(e) => return Err(e).context("API server task panicked"),
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
