//! Bundled runtime counter sources.
//!
//! `simulated` provides a deterministic synthetic workload for demos and
//! development; `procfs` samples the real threads of this process on Linux.

pub mod simulated;

#[cfg(target_os = "linux")]
pub mod procfs;

pub use simulated::SimulatedRuntime;

#[cfg(target_os = "linux")]
pub use procfs::ProcfsRuntime;
