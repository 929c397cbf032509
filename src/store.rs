//! Fixed-capacity sample store.
//!
//! This module provides:
//! - `TaskSample`: rolling usage history plus latest metadata for one task
//! - `SampleStore`: pre-sized registry mapping task name to a sample slot
//! - `MemoryHistory`: parallel free-memory rings on the same window
//! - `MonitorState`: the single shared bundle handed to engine and exporters
//!
//! The registry is append-only: slots are created lazily on first
//! observation and never reclaimed. Once capacity is exhausted, newly
//! observed names are silently dropped. Histories are fixed-length rings
//! read oldest-first from the write index.

use crate::runtime::{MemoryReadings, TaskLifecycleState, TaskStatus};

/// Rolling usage history and latest metadata for one tracked task.
#[derive(Debug, Clone)]
pub struct TaskSample {
    /// Stable identity key.
    pub name: String,
    /// Usage percentages, ring of `window` slots.
    pub usage: Vec<f32>,
    /// Next ring slot to write; history reads oldest-first from here.
    pub index: usize,
    /// Whether this slot is registered. Never cleared.
    pub active: bool,
    /// Last-seen cumulative busy-time counter, baseline for the next delta.
    pub prev_run_time: u32,
    /// Sticky latch: set once usage ever exceeds the threshold, never reset.
    pub over_threshold: bool,

    // Metadata snapshot, copied verbatim each cycle the task is observed.
    pub state: TaskLifecycleState,
    pub current_priority: u32,
    pub base_priority: u32,
    pub run_time: u32,
    pub stack_high_water: u32,
    pub core: Option<u32>,
}

impl TaskSample {
    fn new(name: String, baseline: u32, window: usize) -> Self {
        Self {
            name,
            usage: vec![0.0; window],
            index: 0,
            active: true,
            prev_run_time: baseline,
            over_threshold: false,
            state: TaskLifecycleState::Ready,
            current_priority: 0,
            base_priority: 0,
            run_time: 0,
            stack_high_water: 0,
            core: None,
        }
    }

    /// Most recently written usage sample.
    pub fn latest_usage(&self) -> f32 {
        let window = self.usage.len();
        self.usage[(self.index + window - 1) % window]
    }

    /// Usage history in chronological order, oldest first.
    pub fn history(&self) -> impl Iterator<Item = f32> + '_ {
        let window = self.usage.len();
        (0..window).map(move |offset| self.usage[(self.index + offset) % window])
    }

    fn push(&mut self, usage: f32) {
        self.usage[self.index] = usage;
        self.index = (self.index + 1) % self.usage.len();
    }
}

/// Fixed-capacity table of task samples, scanned linearly by name.
///
/// Capacity is in the tens, so the O(n) scan is cheaper than maintaining a
/// map and keeps the registry a single flat allocation.
#[derive(Debug)]
pub struct SampleStore {
    slots: Vec<TaskSample>,
    capacity: usize,
    window: usize,
    threshold: f32,
}

impl SampleStore {
    /// Create a store with a fixed slot capacity, ring window, and sticky
    /// usage threshold (percent).
    pub fn new(capacity: usize, window: usize, threshold: f32) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            window,
            threshold,
        }
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no task has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// History window length W.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Resolve a task name to its slot, lazily registering it.
    ///
    /// A newly registered task records `current_counter` as its delta
    /// baseline so its first reported sample is 0 rather than a spike
    /// covering its whole pre-observation lifetime. Returns `None` when the
    /// name is unknown and capacity is exhausted; such tasks are dropped
    /// for this and every future cycle.
    pub fn resolve(&mut self, name: &str, current_counter: u32) -> Option<usize> {
        if let Some(found) = self.slots.iter().position(|s| s.active && s.name == name) {
            return Some(found);
        }
        if self.slots.len() >= self.capacity {
            return None;
        }
        self.slots
            .push(TaskSample::new(name.to_string(), current_counter, self.window));
        Some(self.slots.len() - 1)
    }

    /// Append a usage sample to a slot and copy the latest metadata.
    ///
    /// Latches the sticky over-threshold flag when the sample exceeds the
    /// configured threshold; the latch has no reset path.
    pub fn record(&mut self, slot: usize, usage: f32, status: &TaskStatus) {
        let sample = &mut self.slots[slot];
        sample.push(usage);
        if usage > self.threshold {
            sample.over_threshold = true;
        }
        sample.state = status.state;
        sample.current_priority = status.current_priority;
        sample.base_priority = status.base_priority;
        sample.run_time = status.run_time_counter;
        sample.stack_high_water = status.stack_high_water;
        sample.core = status.core;
        sample.prev_run_time = status.run_time_counter;
    }

    /// Append an explicit zero sample to every registered slot not touched
    /// this cycle, keeping all rings the same length for charting.
    pub fn record_idle_gaps(&mut self, touched: &[bool]) {
        for (i, sample) in self.slots.iter_mut().enumerate() {
            if sample.active && !touched.get(i).copied().unwrap_or(false) {
                sample.push(0.0);
            }
        }
    }

    /// Read-only iteration over registered slots, for export.
    pub fn iter(&self) -> impl Iterator<Item = &TaskSample> {
        self.slots.iter().filter(|s| s.active)
    }

    /// Baseline counter for a slot, used by the delta computation.
    pub fn baseline(&self, slot: usize) -> u32 {
        self.slots[slot].prev_run_time
    }

    #[cfg(test)]
    pub(crate) fn slot(&self, index: usize) -> &TaskSample {
        &self.slots[index]
    }
}

/// Parallel rings of free general and auxiliary memory, in kilobytes.
#[derive(Debug)]
pub struct MemoryHistory {
    ram_kb: Vec<u32>,
    aux_kb: Vec<u32>,
    index: usize,
}

impl MemoryHistory {
    /// Create zero-filled rings of `window` slots.
    pub fn new(window: usize) -> Self {
        Self {
            ram_kb: vec![0; window],
            aux_kb: vec![0; window],
            index: 0,
        }
    }

    /// Append one cycle's readings to both rings under the shared index.
    pub fn record(&mut self, readings: MemoryReadings) {
        self.ram_kb[self.index] = readings.free_ram_kb;
        self.aux_kb[self.index] = readings.free_aux_kb;
        self.index = (self.index + 1) % self.ram_kb.len();
    }

    /// General-memory history in chronological order, oldest first.
    pub fn ram_history(&self) -> impl Iterator<Item = u32> + '_ {
        let window = self.ram_kb.len();
        (0..window).map(move |offset| self.ram_kb[(self.index + offset) % window])
    }

    /// Auxiliary-memory history in chronological order, oldest first.
    pub fn aux_history(&self) -> impl Iterator<Item = u32> + '_ {
        let window = self.aux_kb.len();
        (0..window).map(move |offset| self.aux_kb[(self.index + offset) % window])
    }
}

/// Everything the sampling engine writes and the export layer reads.
///
/// Shared as `Arc<parking_lot::RwLock<MonitorState>>`: the engine takes the
/// write lock once per cycle for the in-memory reconciliation only, readers
/// take short read locks to serialize a view.
#[derive(Debug)]
pub struct MonitorState {
    pub tasks: SampleStore,
    pub memory: MemoryHistory,
}

impl MonitorState {
    /// Create an empty state for the given registry capacity, window, and
    /// sticky threshold.
    pub fn new(capacity: usize, window: usize, threshold: f32) -> Self {
        Self {
            tasks: SampleStore::new(capacity, window, threshold),
            memory: MemoryHistory::new(window),
        }
    }
}
