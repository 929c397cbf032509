//! Per-thread counter source backed by procfs.
//!
//! Samples the threads of the current process from
//! `/proc/self/task/<tid>/stat`: thread name, scheduler state, cumulative
//! `utime + stime` clock ticks as the busy counter, priority, and the CPU
//! the thread last ran on. Free memory comes from `/proc/meminfo`
//! (`MemAvailable` for the general pool, `SwapFree` for the auxiliary
//! pool). procfs exposes no stack high-water figure, so it reads 0 here.
//!
//! Threads that exit between the directory walk and the stat read are
//! skipped; only the directory walk itself is a fatal source error.

use std::fs;
use std::path::Path;

use crate::errors::{MonitorError, MonitorResult};
use crate::runtime::{
    MemoryReadings, RuntimeCounterSource, RuntimeSnapshot, TaskLifecycleState, TaskStatus,
};

/// Counter source over the current process's thread table.
#[derive(Debug, Default)]
pub struct ProcfsRuntime;

impl ProcfsRuntime {
    pub fn new() -> Self {
        Self
    }
}

/// Map a procfs state character to a lifecycle state.
fn map_state(state: char) -> TaskLifecycleState {
    match state {
        'R' => TaskLifecycleState::Running,
        'S' | 'D' | 'I' => TaskLifecycleState::Blocked,
        'T' | 't' => TaskLifecycleState::Suspended,
        'Z' | 'X' | 'x' => TaskLifecycleState::Deleted,
        _ => TaskLifecycleState::Ready,
    }
}

/// Parse one `/proc/<tid>/stat` line into a task status.
///
/// The comm field is wrapped in parentheses and may itself contain spaces
/// or parentheses, so fields are split after the final `)`.
fn parse_stat(line: &str) -> Option<TaskStatus> {
    let open = line.find('(')?;
    let close = line.rfind(')')?;
    let name = line.get(open + 1..close)?.to_string();

    let rest: Vec<&str> = line.get(close + 1..)?.split_whitespace().collect();
    // Fields after comm, 0-based: state, then utime at 11, stime at 12,
    // priority at 15, last-run CPU at 36.
    let state = map_state(rest.first()?.chars().next()?);
    let utime: u64 = rest.get(11)?.parse().ok()?;
    let stime: u64 = rest.get(12)?.parse().ok()?;
    let priority: i64 = rest.get(15)?.parse().ok()?;
    let processor: u32 = rest.get(36)?.parse().ok()?;

    let priority = priority.max(0) as u32;
    Some(TaskStatus {
        name,
        run_time_counter: (utime.wrapping_add(stime) & 0xFFFF_FFFF) as u32,
        current_priority: priority,
        base_priority: priority,
        stack_high_water: 0,
        core: Some(processor),
        state,
    })
}

/// Parse a kB-valued `/proc/meminfo` field.
fn meminfo_field(meminfo: &str, field: &str) -> u32 {
    meminfo
        .lines()
        .find(|line| line.starts_with(field))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse().ok())
        .unwrap_or(0)
}

fn read_memory() -> MemoryReadings {
    let meminfo = fs::read_to_string("/proc/meminfo").unwrap_or_default();
    MemoryReadings {
        free_ram_kb: meminfo_field(&meminfo, "MemAvailable:"),
        free_aux_kb: meminfo_field(&meminfo, "SwapFree:"),
    }
}

impl RuntimeCounterSource for ProcfsRuntime {
    fn snapshot(&mut self) -> MonitorResult<RuntimeSnapshot> {
        let task_dir = Path::new("/proc/self/task");
        let entries = fs::read_dir(task_dir)
            .map_err(|e| MonitorError::Source(format!("read {}: {}", task_dir.display(), e)))?;

        let mut tasks = Vec::new();
        let mut total: u32 = 0;
        for entry in entries.flatten() {
            // Raced thread exits show up as unreadable stat files; skip.
            let Ok(stat) = fs::read_to_string(entry.path().join("stat")) else {
                continue;
            };
            if let Some(status) = parse_stat(&stat) {
                total = total.wrapping_add(status.run_time_counter);
                tasks.push(status);
            }
        }

        Ok(RuntimeSnapshot {
            tasks,
            total_run_time: total,
            memory: read_memory(),
        })
    }
}
