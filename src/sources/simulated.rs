//! Deterministic synthetic workload source.
//!
//! A small fixed cast of tasks whose counters advance by closed-form load
//! curves per cycle: a sine-wave network task, a bursty number-cruncher,
//! per-core idle tasks soaking the remainder, and a few near-idle
//! housekeeping tasks that stay below any sensible threshold. Counters are
//! 32-bit and wrap naturally, which exercises the engine's rollover path
//! on long runs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::MonitorResult;
use crate::runtime::{
    MemoryReadings, RuntimeCounterSource, RuntimeSnapshot, TaskLifecycleState, TaskStatus,
};

/// Busy-time ticks one fully-loaded core accrues per sampling cycle.
const TICKS_PER_CYCLE: u32 = 1_000_000;

/// Sine-wave load bounds and period, mirroring a slow background duty cycle.
const SINE_MIN: f32 = 0.05;
const SINE_MAX: f32 = 0.50;
const SINE_PERIOD_CYCLES: f32 = 30.0;

#[derive(Debug, Clone)]
enum LoadModel {
    /// Slow 5-50% duty-cycle wave.
    Sine,
    /// Random busy bursts (1-10 cycles) separated by idle gaps (5-20).
    Burst { busy_left: u32, idle_left: u32 },
    /// Fixed small background fraction.
    Constant(f32),
    /// Soaks whatever its core has left.
    Idle,
}

#[derive(Debug, Clone)]
struct SimTask {
    name: &'static str,
    core: Option<u32>,
    priority: u32,
    base_priority: u32,
    stack_high_water: u32,
    counter: u32,
    load: LoadModel,
}

/// Synthetic runtime: deterministic for a given seed.
pub struct SimulatedRuntime {
    rng: StdRng,
    cycle: u64,
    total: u32,
    tasks: Vec<SimTask>,
    free_ram_kb: u32,
    free_aux_kb: u32,
}

impl SimulatedRuntime {
    /// Create a simulated runtime with the default cast and seed.
    pub fn new() -> Self {
        Self::with_seed(0x7a5c_05e5)
    }

    /// Create a simulated runtime with an explicit RNG seed.
    pub fn with_seed(seed: u64) -> Self {
        let tasks = vec![
            SimTask {
                name: "net_rx",
                core: Some(0),
                priority: 18,
                base_priority: 18,
                stack_high_water: 2048,
                counter: 0,
                load: LoadModel::Sine,
            },
            SimTask {
                name: "crunch",
                core: Some(1),
                priority: 5,
                base_priority: 5,
                stack_high_water: 4096,
                counter: 0,
                load: LoadModel::Burst {
                    busy_left: 0,
                    idle_left: 8,
                },
            },
            SimTask {
                name: "tmr_svc",
                core: Some(0),
                priority: 19,
                base_priority: 19,
                stack_high_water: 1024,
                counter: 0,
                load: LoadModel::Constant(0.004),
            },
            SimTask {
                name: "wdt",
                core: None,
                priority: 22,
                base_priority: 20,
                stack_high_water: 512,
                counter: 0,
                load: LoadModel::Constant(0.001),
            },
            SimTask {
                name: "logger",
                core: None,
                priority: 3,
                base_priority: 3,
                stack_high_water: 1536,
                counter: 0,
                load: LoadModel::Constant(0.003),
            },
            SimTask {
                name: "IDLE0",
                core: Some(0),
                priority: 0,
                base_priority: 0,
                stack_high_water: 768,
                counter: 0,
                load: LoadModel::Idle,
            },
            SimTask {
                name: "IDLE1",
                core: Some(1),
                priority: 0,
                base_priority: 0,
                stack_high_water: 768,
                counter: 0,
                load: LoadModel::Idle,
            },
        ];

        Self {
            rng: StdRng::seed_from_u64(seed),
            cycle: 0,
            total: 0,
            tasks,
            free_ram_kb: 262_144,
            free_aux_kb: 4_194_304,
        }
    }

    /// Busy fraction for one task this cycle. Idle tasks are filled in
    /// afterwards from their core's remainder.
    fn busy_fraction(&mut self, task_index: usize) -> f32 {
        let cycle = self.cycle as f32;
        match &mut self.tasks[task_index].load {
            LoadModel::Sine => {
                let phase = 2.0 * std::f32::consts::PI * cycle / SINE_PERIOD_CYCLES;
                SINE_MIN + (SINE_MAX - SINE_MIN) * 0.5 * (phase.sin() + 1.0)
            }
            LoadModel::Burst {
                busy_left,
                idle_left,
            } => {
                if *busy_left > 0 {
                    *busy_left -= 1;
                    0.9
                } else if *idle_left > 0 {
                    *idle_left -= 1;
                    0.0
                } else {
                    // Phase boundary: draw the next burst and gap lengths.
                    let busy = self.rng.random_range(1..=10u32);
                    let idle = self.rng.random_range(5..=20u32);
                    self.tasks[task_index].load = LoadModel::Burst {
                        busy_left: busy - 1,
                        idle_left: idle,
                    };
                    0.9
                }
            }
            LoadModel::Constant(frac) => *frac,
            LoadModel::Idle => 0.0,
        }
    }

    fn advance_memory(&mut self, crunch_busy: bool) {
        // Small random walk, with a dip while the cruncher holds its
        // working set.
        let wander = self.rng.random_range(-512i32..=512i32);
        let base = 262_144i64 + i64::from(wander) - if crunch_busy { 5_120 } else { 0 };
        self.free_ram_kb = base.max(0) as u32;

        let aux_wander = self.rng.random_range(-2_048i32..=2_048i32);
        self.free_aux_kb = (4_194_304i64 + i64::from(aux_wander)).max(0) as u32;
    }
}

impl Default for SimulatedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeCounterSource for SimulatedRuntime {
    fn snapshot(&mut self) -> MonitorResult<RuntimeSnapshot> {
        // First pass: non-idle fractions, accumulated per core so the idle
        // tasks can soak the remainder. Unpinned tasks are accounted to
        // core 0.
        let mut core_busy = [0.0f32; 2];
        let mut fractions = vec![0.0f32; self.tasks.len()];
        for i in 0..self.tasks.len() {
            if matches!(self.tasks[i].load, LoadModel::Idle) {
                continue;
            }
            let frac = self.busy_fraction(i);
            fractions[i] = frac;
            let core = self.tasks[i].core.unwrap_or(0) as usize;
            core_busy[core.min(1)] += frac;
        }
        for i in 0..self.tasks.len() {
            if matches!(self.tasks[i].load, LoadModel::Idle) {
                let core = self.tasks[i].core.unwrap_or(0) as usize;
                fractions[i] = (1.0 - core_busy[core.min(1)]).max(0.0);
            }
        }

        let crunch_busy = self
            .tasks
            .iter()
            .zip(&fractions)
            .any(|(t, &f)| t.name == "crunch" && f > 0.5);

        let mut tasks = Vec::with_capacity(self.tasks.len());
        for (task, frac) in self.tasks.iter_mut().zip(&fractions) {
            let delta = (frac * TICKS_PER_CYCLE as f32) as u32;
            task.counter = task.counter.wrapping_add(delta);
            self.total = self.total.wrapping_add(delta);

            let state = match task.load {
                LoadModel::Idle => TaskLifecycleState::Ready,
                LoadModel::Burst { .. } if *frac > 0.5 => TaskLifecycleState::Running,
                LoadModel::Burst { .. } => TaskLifecycleState::Blocked,
                LoadModel::Sine => TaskLifecycleState::Running,
                LoadModel::Constant(_) => TaskLifecycleState::Blocked,
            };

            tasks.push(TaskStatus {
                name: task.name.to_string(),
                run_time_counter: task.counter,
                current_priority: task.priority,
                base_priority: task.base_priority,
                stack_high_water: task.stack_high_water,
                core: task.core,
                state,
            });
        }

        self.advance_memory(crunch_busy);
        self.cycle += 1;

        Ok(RuntimeSnapshot {
            tasks,
            total_run_time: self.total,
            memory: MemoryReadings {
                free_ram_kb: self.free_ram_kb,
                free_aux_kb: self.free_aux_kb,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let mut a = SimulatedRuntime::with_seed(42);
        let mut b = SimulatedRuntime::with_seed(42);
        for _ in 0..50 {
            assert_eq!(a.snapshot().unwrap(), b.snapshot().unwrap());
        }
    }

    #[test]
    fn test_total_advances_every_cycle() {
        let mut sim = SimulatedRuntime::with_seed(7);
        let mut prev_total = 0u32;
        for _ in 0..20 {
            let snapshot = sim.snapshot().unwrap();
            assert_ne!(snapshot.total_run_time, prev_total);
            prev_total = snapshot.total_run_time;
        }
    }

    #[test]
    fn test_cast_is_stable_and_counters_monotonic_short_term() {
        let mut sim = SimulatedRuntime::with_seed(7);
        let first = sim.snapshot().unwrap();
        let names: Vec<_> = first.tasks.iter().map(|t| t.name.clone()).collect();
        assert!(names.contains(&"net_rx".to_string()));
        assert!(names.contains(&"crunch".to_string()));
        assert!(names.contains(&"IDLE0".to_string()));

        let mut prev: Vec<u32> = first.tasks.iter().map(|t| t.run_time_counter).collect();
        for _ in 0..30 {
            let snapshot = sim.snapshot().unwrap();
            assert_eq!(
                snapshot.tasks.iter().map(|t| &t.name).collect::<Vec<_>>(),
                names.iter().collect::<Vec<_>>()
            );
            for (t, p) in snapshot.tasks.iter().zip(&prev) {
                assert!(t.run_time_counter >= *p);
            }
            prev = snapshot.tasks.iter().map(|t| t.run_time_counter).collect();
        }
    }

    #[test]
    fn test_sine_task_stays_within_bounds() {
        let mut sim = SimulatedRuntime::with_seed(7);
        let mut prev_net = 0u32;
        for _ in 0..60 {
            let snapshot = sim.snapshot().unwrap();
            let net = snapshot
                .tasks
                .iter()
                .find(|t| t.name == "net_rx")
                .unwrap()
                .run_time_counter;
            let delta = net - prev_net;
            let frac = delta as f32 / TICKS_PER_CYCLE as f32;
            assert!((SINE_MIN - 0.01..=SINE_MAX + 0.01).contains(&frac));
            prev_net = net;
        }
    }

    #[test]
    fn test_memory_readings_are_populated() {
        let mut sim = SimulatedRuntime::with_seed(7);
        let snapshot = sim.snapshot().unwrap();
        assert!(snapshot.memory.free_ram_kb > 0);
        assert!(snapshot.memory.free_aux_kb > 0);
    }
}
