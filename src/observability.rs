//! Observability module for centralized metrics and logging setup.
//!
//! This module provides:
//! - Structured logging with configurable levels
//! - Prometheus metrics collection and export
//! - Internal diagnostic counters for the sampling engine's silent
//!   anomaly paths (registry full, stale counters, corrupted deltas)
//!
//! The diagnostic counters are deliberately internal-only: the data
//! endpoints never surface sampling anomalies, matching the monitor's
//! best-effort contract.

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::prelude::*;

use crate::monitor_config::MonitorConfig;

/// Initialize structured logging with tracing and configuration
pub fn init_tracing(config: &MonitorConfig) -> Result<()> {
    // Create the filter based on configuration
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("taskscope={}", config.log_level).parse()?)
        .add_directive("hyper=warn".parse()?);

    // Pretty formatting for development, JSON otherwise
    if std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()) == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .init();
    }

    tracing::info!(
        log_level = %config.log_level,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Initialize metrics collection with Prometheus exporter
pub fn init_metrics() -> Result<PrometheusHandle> {
    let builder = PrometheusBuilder::new();
    let handle = builder.install_recorder()?;

    tracing::info!("Metrics collection initialized");
    Ok(handle)
}

/// Record one completed sampling cycle
pub fn record_sampling_cycle(duration: std::time::Duration, task_count: usize) {
    metrics::counter!("taskscope_sampling_cycles_total").increment(1);
    metrics::histogram!("taskscope_sampling_cycle_duration_seconds").record(duration.as_secs_f64());
    metrics::gauge!("taskscope_observed_tasks").set(task_count as f64);
}

/// Record a task dropped because the registry is at capacity
pub fn record_registry_full(task_name: &str) {
    metrics::counter!("taskscope_registry_full_total").increment(1);
    tracing::debug!(task = %task_name, "Registry full, task dropped");
}

/// Record a sample discarded for a small backward counter jump
pub fn record_stale_counter(task_name: &str) {
    metrics::counter!("taskscope_stale_counter_total").increment(1);
    tracing::debug!(task = %task_name, "Stale counter, sample discarded");
}

/// Record a sample discarded for an implausibly large delta
pub fn record_corrupted_delta(task_name: &str) {
    metrics::counter!("taskscope_corrupted_delta_total").increment(1);
    tracing::debug!(task = %task_name, "Corrupted delta, sample discarded");
}

/// Record request metrics
pub fn record_request_metrics(method: &str, status: u16, duration: std::time::Duration) {
    let method = method.to_string();
    let status = status.to_string();
    metrics::counter!("requests_total", "method" => method, "status" => status).increment(1);
    metrics::histogram!("request_duration_seconds").record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Recording helpers must be safe without an installed recorder
    #[test]
    fn test_recording_without_recorder_does_not_panic() {
        record_sampling_cycle(Duration::from_millis(2), 12);
        record_registry_full("overflow_task");
        record_stale_counter("worker");
        record_corrupted_delta("worker");
        record_request_metrics("GET", 200, Duration::from_millis(5));
    }
}
