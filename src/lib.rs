//! # taskscope
//!
//! A live per-task CPU and memory monitor: a periodic sampling engine turns
//! cumulative busy-time counters into rolling windows of percentage
//! utilization and serves them as JSON plus a small dashboard over HTTP.

pub mod errors;
pub mod export;
pub mod monitor_config;
pub mod observability;
pub mod runtime;
pub mod sampler;
pub mod server;
pub mod sources;
pub mod store;

// Re-export types for easier access
pub use monitor_config::MonitorConfig;
pub use runtime::{RuntimeCounterSource, RuntimeSnapshot, TaskStatus};
pub use sampler::SamplingEngine;
pub use store::MonitorState;
