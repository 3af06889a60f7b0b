#![deny(unused)]
//! Concierge - conversational request orchestration for small businesses.
//!
//! Serves the classic classify/dispatch/respond pipeline and the native
//! tool-calling loop behind one HTTP gateway.

use concierge_controller::ConciergeBuilder;
use concierge_core::config::AppConfig;
use concierge_gateway::{AppState, GatewayConfig, GatewayServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    concierge_governance::configure_tracing(&config.logging)?;
    tracing::info!("Starting Concierge v{}", env!("CARGO_PKG_VERSION"));

    // =========================================================================
    // Engine
    // =========================================================================
    let engine = ConciergeBuilder::new(config.clone()).build()?;
    tracing::info!(
        model = %config.model.default_model,
        strategy = ?config.cache.strategy,
        grading = config.grading.enabled,
        "Orchestrators ready"
    );

    // =========================================================================
    // Gateway
    // =========================================================================
    let gateway_config = GatewayConfig::from(&config.server);
    let state = AppState {
        classic: engine.classic,
        native: engine.native,
        records: engine.records,
    };
    let mut server = GatewayServer::new(gateway_config.clone(), state);

    if config.server.enable_metrics {
        let handle = concierge_governance::setup_metrics_recorder()?;
        server = server.with_metrics(handle);
        tracing::info!("Prometheus metrics exposed on /metrics");
    }

    tracing::info!(host = %gateway_config.host, port = gateway_config.port, "Gateway initialized");

    server.run().await?;

    if let Some(task) = engine.grading_task {
        task.abort();
    }
    Ok(())
}
