//! Schema upgrades for the stored state blob.
//!
//! Every blob written by this crate carries `schemaVersion`. Blobs without it
//! predate weekly targets and are treated as version 1. Each step upgrades a
//! blob by exactly one version, so a blob of any age walks the whole chain.

use serde_json::{json, Map, Value};

use crate::habit::TargetPerWeek;

pub const SCHEMA_VERSION_KEY: &str = "schemaVersion";
pub const CURRENT_SCHEMA_VERSION: u64 = 2;

type Step = fn(&mut Map<String, Value>);

/// `(from_version, step)`, ordered and contiguous.
const STEPS: &[(u64, Step)] = &[(1, add_weekly_targets)];

pub fn schema_version(blob: &Map<String, Value>) -> u64 {
    blob.get(SCHEMA_VERSION_KEY)
        .and_then(Value::as_u64)
        .unwrap_or(1)
        .max(1)
}

pub fn upgrade(mut blob: Map<String, Value>) -> Map<String, Value> {
    let mut version = schema_version(&blob);
    if version > CURRENT_SCHEMA_VERSION {
        tracing::warn!(
            version,
            supported = CURRENT_SCHEMA_VERSION,
            "state written by a newer version, loading best effort"
        );
        return blob;
    }
    for (from, step) in STEPS {
        if *from != version {
            continue;
        }
        step(&mut blob);
        version = from + 1;
        tracing::debug!(from = *from, to = version, "migrated state blob");
    }
    blob.insert(SCHEMA_VERSION_KEY.to_string(), json!(version));
    blob
}

// v1 -> v2: habits gained `targetPerWeek`.
fn add_weekly_targets(blob: &mut Map<String, Value>) {
    let Some(Value::Array(habits)) = blob.get_mut("habits") else {
        return;
    };
    for habit in habits.iter_mut().filter_map(Value::as_object_mut) {
        let target = TargetPerWeek::from_json(habit.get("targetPerWeek"));
        habit.insert("targetPerWeek".to_string(), json!(target.get()));
    }
}
