//! Periodic sampling engine.
//!
//! This module provides:
//! - Wraparound-safe delta arithmetic over 32-bit busy-time counters
//! - The per-cycle reconciliation of a runtime snapshot into the store
//! - The perpetual fixed-period sampling loop
//!
//! The engine is the store's only writer. Per-task anomalies (registry
//! full, stale counters, implausible deltas) skip the affected task for the
//! cycle and are counted internally; a snapshot fetch failure is fatal and
//! terminates the loop, freezing all histories at their last state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::errors::{error_logging, MonitorResult};
use crate::monitor_config::MonitorConfig;
use crate::observability;
use crate::runtime::{RuntimeCounterSource, RuntimeSnapshot};
use crate::store::MonitorState;

/// Upper bound on a plausible single-cycle counter delta.
///
/// A backward jump larger than this is a genuine 32-bit wraparound (the
/// unsigned-subtraction delta is correct); a smaller backward jump is
/// cross-core sampling skew and the cycle is discarded for that task. The
/// same bound rejects implausibly large forward deltas from snapshot races.
pub const COUNTER_JUMP_LIMIT: u32 = 0xF000_0000;

/// Compute the busy-time delta between two counter observations.
///
/// Returns `None` when the observation pair is not trustworthy: a small
/// backward jump, or a delta beyond [`COUNTER_JUMP_LIMIT`] in either
/// direction. Callers must leave the baseline unchanged in that case.
pub fn counter_delta(prev: u32, current: u32) -> Option<u32> {
    if current >= prev {
        let delta = current - prev;
        if delta > COUNTER_JUMP_LIMIT {
            return None;
        }
        return Some(delta);
    }
    let regression = prev - current;
    if regression <= COUNTER_JUMP_LIMIT {
        // Small backward jump: concurrent sampling skew, not a wrap.
        return None;
    }
    // Genuine wraparound: the unsigned subtraction is the true distance,
    // and regression > limit bounds it under 2^32 - limit.
    Some(current.wrapping_sub(prev))
}

/// Outcome of one engine cycle, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Snapshot reconciled into the store.
    Sampled { tasks: usize },
    /// Empty or duplicate snapshot; nothing written.
    Skipped,
}

/// The periodic sampling engine: single writer of the shared store.
pub struct SamplingEngine<S> {
    source: S,
    state: Arc<RwLock<MonitorState>>,
    period: Duration,
    prev_total: u32,
    cycle: u64,
}

impl<S: RuntimeCounterSource> SamplingEngine<S> {
    /// Create an engine over a counter source and shared state.
    pub fn new(source: S, state: Arc<RwLock<MonitorState>>, config: &MonitorConfig) -> Self {
        Self {
            source,
            state,
            period: Duration::from_millis(config.sample_interval_ms()),
            prev_total: 0,
            cycle: 0,
        }
    }

    /// Run one sampling cycle: fetch a snapshot and reconcile it.
    ///
    /// A source error propagates to the caller (fatal); everything else is
    /// handled per the skip rules.
    pub fn sample_once(&mut self) -> MonitorResult<CycleOutcome> {
        let started = Instant::now();
        let snapshot = self.source.snapshot()?;
        self.cycle += 1;

        // Defensive: an empty table or an unchanged global total means no
        // schedulable time has elapsed since the last sample. Retry next
        // period without touching any ring.
        if snapshot.tasks.is_empty() || snapshot.total_run_time == self.prev_total {
            debug!(
                cycle = self.cycle,
                total = snapshot.total_run_time,
                "Skipping duplicate or empty snapshot"
            );
            return Ok(CycleOutcome::Skipped);
        }

        let global_delta = snapshot.total_run_time.wrapping_sub(self.prev_total);
        self.prev_total = snapshot.total_run_time;

        let task_count = snapshot.tasks.len();
        {
            let mut state = self.state.write();
            reconcile(&mut state, &snapshot, global_delta);
        }

        observability::record_sampling_cycle(started.elapsed(), task_count);
        Ok(CycleOutcome::Sampled { tasks: task_count })
    }

    /// Run the perpetual sampling loop at the configured period.
    ///
    /// Never returns except on a fatal source error, after which all
    /// histories freeze at their last state.
    pub async fn run(mut self) {
        info!(period_ms = self.period.as_millis() as u64, "Sampling engine started");
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(err) = self.sample_once() {
                error_logging::log_source_error(
                    &err,
                    "fetch_runtime_snapshot",
                    Some(self.cycle),
                    None,
                );
                break;
            }
        }
    }
}

/// Reconcile one snapshot into the store under the write lock.
///
/// All tasks in the cycle are normalized against the same `global_delta`
/// and the same ring epoch, so one export read reflects one internally
/// consistent cycle.
fn reconcile(state: &mut MonitorState, snapshot: &RuntimeSnapshot, global_delta: u32) {
    let mut touched = vec![false; state.tasks.len() + snapshot.tasks.len()];

    for status in &snapshot.tasks {
        let Some(slot) = state.tasks.resolve(&status.name, status.run_time_counter) else {
            // Registry full: this name is dropped for the process lifetime.
            observability::record_registry_full(&status.name);
            continue;
        };

        let prev = state.tasks.baseline(slot);
        let Some(delta) = counter_delta(prev, status.run_time_counter) else {
            if status.run_time_counter < prev {
                observability::record_stale_counter(&status.name);
            } else {
                observability::record_corrupted_delta(&status.name);
            }
            // Baseline untouched, no sample this cycle for this task. The
            // task still counts as present, so no zero gap is appended.
            touched[slot] = true;
            continue;
        };

        let usage = if global_delta == 0 {
            0.0
        } else {
            delta as f32 / global_delta as f32 * 100.0
        };
        state.tasks.record(slot, usage, status);
        touched[slot] = true;
    }

    // Registered tasks absent from this snapshot get an explicit zero so
    // every exported ring stays the same length and alignment.
    state.tasks.record_idle_gaps(&touched);
    state.memory.record(snapshot.memory);
}
