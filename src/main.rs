use std::env;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use taskscope::monitor_config::{MonitorConfig, SourceKind};
use taskscope::observability;
use taskscope::sampler::SamplingEngine;
use taskscope::server;
use taskscope::sources::SimulatedRuntime;
use taskscope::store::MonitorState;
use tracing::info;

/// Validate monitor configuration at startup
fn validate_monitor_config(config: &MonitorConfig) -> Result<()> {
    config.validate().map_err(|e| {
        anyhow::anyhow!(
            "Monitor configuration validation failed: {}. Please check your environment values.",
            e
        )
    })?;

    if config.http_port < 1024
        && env::var("ALLOW_PRIVILEGED_PORTS").unwrap_or_else(|_| "false".to_string()) != "true"
    {
        return Err(anyhow::anyhow!(
            "MONITOR_PORT {} is a privileged port (< 1024). Set ALLOW_PRIVILEGED_PORTS=true to allow or use a port >= 1024",
            config.http_port
        ));
    }

    info!("Monitor configuration validated successfully");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let config = MonitorConfig::from_env();

    // Initialize structured logging before anything can fail loudly
    observability::init_tracing(&config)?;

    validate_monitor_config(&config)?;

    // Initialize metrics collection for the internal diagnostic counters
    let metrics_handle = observability::init_metrics()?;

    // Shared monitor state: the engine is the only writer, HTTP handlers
    // read concurrently.
    let state = Arc::new(RwLock::new(MonitorState::new(
        config.registry_capacity,
        config.window_size,
        config.usage_threshold_percent,
    )));

    // Spawn the sampling engine over the configured counter source
    match config.source {
        SourceKind::Simulated => {
            info!("Using simulated workload source");
            let engine = SamplingEngine::new(SimulatedRuntime::new(), Arc::clone(&state), &config);
            tokio::spawn(engine.run());
        }
        SourceKind::Procfs => {
            #[cfg(target_os = "linux")]
            {
                info!("Using procfs thread source");
                let engine = SamplingEngine::new(
                    taskscope::sources::ProcfsRuntime::new(),
                    Arc::clone(&state),
                    &config,
                );
                tokio::spawn(engine.run());
            }
            #[cfg(not(target_os = "linux"))]
            {
                return Err(anyhow::anyhow!(
                    "MONITOR_SOURCE=procfs is only available on Linux"
                ));
            }
        }
    }

    // Start the dashboard HTTP server
    server::start_dashboard_server(Arc::clone(&state), metrics_handle, &config).await?;

    info!(
        port = config.http_port,
        sample_rate_hz = config.sample_rate_hz,
        window = config.window_size,
        capacity = config.registry_capacity,
        threshold_percent = config.usage_threshold_percent,
        "taskscope started"
    );

    // Run until interrupted
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
