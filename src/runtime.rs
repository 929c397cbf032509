//! Runtime counter source contract.
//!
//! The sampling engine is decoupled from the scheduler it observes: anything
//! that can produce a [`RuntimeSnapshot`] (a procfs scan, a simulated
//! workload, a scripted test fixture) can drive it. This module defines
//! that seam.

use serde::{Serialize, Serializer};

use crate::errors::MonitorResult;

/// Sentinel core id exported for tasks that may run on any core.
///
/// The dashboard renders this value as "-"; it is part of the wire contract
/// and must not change.
pub const CORE_UNPINNED: u32 = 2_147_483_647;

/// Scheduler lifecycle state of a task.
///
/// The integer codes are part of the `/dataInfo` wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskLifecycleState {
    Running = 0,
    Ready = 1,
    Blocked = 2,
    Suspended = 3,
    Deleted = 4,
}

impl TaskLifecycleState {
    /// Integer lifecycle code used on the wire.
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl Serialize for TaskLifecycleState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.code())
    }
}

/// One observed task in a runtime snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStatus {
    /// Stable identity key; assumed unique among concurrently-live tasks.
    pub name: String,
    /// Cumulative busy-time counter. Monotonic until it wraps.
    pub run_time_counter: u32,
    /// Current scheduling priority.
    pub current_priority: u32,
    /// Base (unboosted) scheduling priority.
    pub base_priority: u32,
    /// Minimum observed stack headroom, in the source's native units.
    pub stack_high_water: u32,
    /// Core the task is pinned to, or `None` if it may run anywhere.
    pub core: Option<u32>,
    /// Scheduler lifecycle state.
    pub state: TaskLifecycleState,
}

/// Free-memory readings for one sampling cycle, in kilobytes.
///
/// Best-effort by construction: sources report whatever the platform
/// exposes and never fail here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryReadings {
    /// Free general-purpose memory.
    pub free_ram_kb: u32,
    /// Free auxiliary pool memory (PSRAM, swap, or zero if absent).
    pub free_aux_kb: u32,
}

/// One cycle's snapshot of the observed runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSnapshot {
    /// All currently-known tasks with their counters and metadata.
    pub tasks: Vec<TaskStatus>,
    /// Global cumulative busy total across all tasks and cores.
    pub total_run_time: u32,
    /// Free-memory readings taken alongside the task table.
    pub memory: MemoryReadings,
}

/// Supplier of runtime snapshots for the sampling engine.
///
/// A snapshot failure is fatal to the sampling loop: the engine cannot run
/// without its fetch path, so it logs and terminates rather than retry.
pub trait RuntimeCounterSource {
    /// Capture a snapshot of all currently-known tasks.
    fn snapshot(&mut self) -> MonitorResult<RuntimeSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_codes_match_wire_contract() {
        assert_eq!(TaskLifecycleState::Running.code(), 0);
        assert_eq!(TaskLifecycleState::Ready.code(), 1);
        assert_eq!(TaskLifecycleState::Blocked.code(), 2);
        assert_eq!(TaskLifecycleState::Suspended.code(), 3);
        assert_eq!(TaskLifecycleState::Deleted.code(), 4);
    }

    #[test]
    fn test_unpinned_sentinel_is_max_int() {
        assert_eq!(CORE_UNPINNED, i32::MAX as u32);
    }

    #[test]
    fn test_lifecycle_serializes_as_integer() {
        let value = serde_json::to_value(TaskLifecycleState::Blocked).unwrap();
        assert_eq!(value, serde_json::json!(2));
    }
}
