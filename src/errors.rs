//! # Application Error Types
//!
//! This module defines common error types used throughout the taskscope
//! monitor. It provides structured error handling for the sampling engine,
//! the export layer, and the HTTP surface.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorError {
    /// Configuration validation errors
    Config(String),
    /// Runtime counter source errors (snapshot fetch failures)
    Source(String),
    /// Export/serialization errors
    Export(String),
    /// Network/communication errors
    Network(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            MonitorError::Source(msg) => write!(f, "[SOURCE] {}", msg),
            MonitorError::Export(msg) => write!(f, "[EXPORT] {}", msg),
            MonitorError::Network(msg) => write!(f, "[NETWORK] {}", msg),
            MonitorError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for MonitorError {}

impl From<anyhow::Error> for MonitorError {
    fn from(err: anyhow::Error) -> Self {
        MonitorError::Internal(err.to_string())
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::Source(err.to_string())
    }
}

/// Result type alias for convenience
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Standardized error logging utilities for consistent error reporting across the monitor
pub mod error_logging {
    use tracing::error;

    /// Log counter-source failures with sampling context
    pub fn log_source_error(
        error: &impl std::fmt::Display,
        operation: &str,
        cycle: Option<u64>,
        task_count: Option<usize>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            cycle = ?cycle,
            task_count = ?task_count,
            "Runtime counter source failed"
        );
    }

    /// Log network/communication errors with connection context
    pub fn log_network_error(
        error: &impl std::fmt::Display,
        operation: &str,
        endpoint: Option<&str>,
        attempt_count: Option<u32>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            endpoint = ?endpoint,
            attempt_count = ?attempt_count,
            "Network operation failed"
        );
    }

    /// Log export/serialization errors with view context
    pub fn log_export_error(error: &impl std::fmt::Display, view: &str) {
        error!(
            error = %error,
            view = %view,
            "Export serialization failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_tags() {
        assert_eq!(
            MonitorError::Config("bad rate".to_string()).to_string(),
            "[CONFIG] bad rate"
        );
        assert_eq!(
            MonitorError::Source("snapshot failed".to_string()).to_string(),
            "[SOURCE] snapshot failed"
        );
        assert_eq!(
            MonitorError::Network("bind refused".to_string()).to_string(),
            "[NETWORK] bind refused"
        );
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: MonitorError = anyhow::anyhow!("boom").into();
        assert_eq!(err, MonitorError::Internal("boom".to_string()));
    }

    #[test]
    fn test_io_conversion_maps_to_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such task dir");
        let err: MonitorError = io.into();
        assert!(matches!(err, MonitorError::Source(_)));
    }
}
