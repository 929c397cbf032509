//! # Monitor Configuration
//!
//! Environment-specific configuration for the sampling engine and the
//! dashboard HTTP surface.

use std::env;

/// Which runtime counter source feeds the sampling engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Synthetic workload cast, useful for demos and development.
    Simulated,
    /// Per-thread counters of this process from procfs (Linux only).
    Procfs,
}

/// Monitor configuration for different environments
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Sampling frequency in Hz (1, 2, 4, or 8)
    pub sample_rate_hz: u32,
    /// History window length W (ring slots per task and memory series)
    pub window_size: usize,
    /// Maximum number of distinct tasks ever tracked
    pub registry_capacity: usize,
    /// Usage percentage above which a task becomes permanently "interesting"
    pub usage_threshold_percent: f32,
    /// Dashboard HTTP port
    pub http_port: u16,
    /// Bind the dashboard on all interfaces rather than loopback only
    pub bind_all_interfaces: bool,
    /// Counter source for the sampling engine
    pub source: SourceKind,
    /// Log level for monitor components
    pub log_level: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 1,
            window_size: 100,
            registry_capacity: 20,
            usage_threshold_percent: 1.0,
            http_port: 8081,
            bind_all_interfaces: true,
            source: SourceKind::Simulated,
            log_level: "info".to_string(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sample_rate_hz: env::var("SAMPLE_RATE_HZ")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sample_rate_hz),
            window_size: env::var("SAMPLE_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.window_size),
            registry_capacity: env::var("TASK_REGISTRY_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.registry_capacity),
            usage_threshold_percent: env::var("USAGE_THRESHOLD_PERCENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.usage_threshold_percent),
            http_port: env::var("MONITOR_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.http_port),
            bind_all_interfaces: env::var("MONITOR_BIND_ALL_INTERFACES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.bind_all_interfaces),
            source: match env::var("MONITOR_SOURCE").as_deref() {
                Ok("procfs") => SourceKind::Procfs,
                _ => SourceKind::Simulated,
            },
            log_level: env::var("MONITOR_LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    /// Sampling period in milliseconds
    pub fn sample_interval_ms(&self) -> u64 {
        1000 / u64::from(self.sample_rate_hz)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if ![1, 2, 4, 8].contains(&self.sample_rate_hz) {
            return Err(format!(
                "Invalid sample rate {} Hz: must be 1, 2, 4 or 8",
                self.sample_rate_hz
            ));
        }

        if self.window_size == 0 {
            return Err("History window size cannot be 0".to_string());
        }

        if self.registry_capacity == 0 {
            return Err("Task registry capacity cannot be 0".to_string());
        }

        if self.usage_threshold_percent <= 0.0 || self.usage_threshold_percent >= 100.0 {
            return Err(format!(
                "Invalid usage threshold {}%: must be within (0, 100)",
                self.usage_threshold_percent
            ));
        }

        if self.http_port == 0 {
            return Err(format!("Invalid monitor port: {}", self.http_port));
        }

        Ok(())
    }
}

/// Environment-specific configuration presets
pub mod presets {
    use super::{MonitorConfig, SourceKind};

    /// Development configuration: simulated workload, verbose logs
    pub fn development() -> MonitorConfig {
        MonitorConfig {
            source: SourceKind::Simulated,
            log_level: "debug".to_string(),
            ..Default::default()
        }
    }

    /// Production configuration: real counters, quiet logs
    pub fn production() -> MonitorConfig {
        MonitorConfig {
            source: SourceKind::Procfs,
            log_level: "warn".to_string(),
            ..Default::default()
        }
    }

    /// Minimal configuration for tight-memory deployments
    pub fn minimal() -> MonitorConfig {
        MonitorConfig {
            window_size: 30,
            registry_capacity: 10,
            log_level: "error".to_string(),
            ..Default::default()
        }
    }
}
