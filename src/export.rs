//! Read-only JSON export views over the sample store.
//!
//! Three views, each a pure read taken under a short read lock:
//! - full history: every over-threshold task's W-length ring plus both
//!   memory series, oldest first
//! - latest: the single most recent sample per over-threshold task
//! - task info: core/priority/stack/state metadata for every registered
//!   task, threshold or not
//!
//! Percentages are encoded with exactly one decimal digit; the unpinned
//! core sentinel is part of the wire contract.

use serde_json::{json, Map, Value};

use crate::runtime::CORE_UNPINNED;
use crate::store::MonitorState;

/// Round a usage percentage to the single decimal digit the wire carries.
fn round1(value: f32) -> f64 {
    (f64::from(value) * 10.0).round() / 10.0
}

/// Full-history view (`/data`): W samples per over-threshold task, oldest
/// first, plus `"ram"` and `"psram"` kilobyte series on the same window.
pub fn full_history(state: &MonitorState) -> Value {
    let mut out = Map::new();
    for sample in state.tasks.iter().filter(|s| s.over_threshold) {
        let series: Vec<Value> = sample.history().map(|u| json!(round1(u))).collect();
        out.insert(sample.name.clone(), Value::Array(series));
    }
    out.insert(
        "ram".to_string(),
        Value::Array(state.memory.ram_history().map(|kb| json!(kb)).collect()),
    );
    out.insert(
        "psram".to_string(),
        Value::Array(state.memory.aux_history().map(|kb| json!(kb)).collect()),
    );
    Value::Object(out)
}

/// Latest-value view (`/dataCurrent`): most recent sample per
/// over-threshold task.
pub fn latest(state: &MonitorState) -> Value {
    let mut out = Map::new();
    for sample in state.tasks.iter().filter(|s| s.over_threshold) {
        out.insert(sample.name.clone(), json!(round1(sample.latest_usage())));
    }
    Value::Object(out)
}

/// Metadata view (`/dataInfo`): every registered task regardless of
/// threshold, with the integer lifecycle code and the core sentinel.
pub fn task_info(state: &MonitorState) -> Value {
    let mut out = Map::new();
    for sample in state.tasks.iter() {
        out.insert(
            sample.name.clone(),
            json!({
                "core": sample.core.unwrap_or(CORE_UNPINNED),
                "prio": sample.current_priority,
                "stackHW": sample.stack_high_water,
                "state": sample.state,
            }),
        );
    }
    Value::Object(out)
}
