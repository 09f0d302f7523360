use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::date::DayKey;
use crate::habit::{self, DayLog, Habit, State, TargetPerWeek};
use crate::migrate;

pub const APP_ID: &str = "quiet-daily";

/// Backup file written by export and accepted by import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    pub exported_at: String,
    pub app: String,
    pub data: State,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("import payload must be an object holding `habits` and `logs`")]
    InvalidShape,
}

pub fn export_snapshot(state: &State, now: DateTime<Utc>) -> ExportEnvelope {
    ExportEnvelope {
        exported_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        app: APP_ID.to_string(),
        data: state.clone(),
    }
}

/// Defensive parse of external JSON, either an [`ExportEnvelope`] or a bare
/// `{habits, logs}` object. `None` only when there is no object to read;
/// every field-level problem is repaired or dropped instead.
pub fn sanitize_imported(raw: &Value) -> Option<State> {
    let top = raw.as_object()?;
    let body = match top.get("data") {
        None => top,
        Some(Value::Object(inner)) => inner,
        Some(_) => return None,
    };
    let body = migrate::upgrade(body.clone());
    Some(clean_state(&body))
}

pub fn parse_import(text: &str) -> Result<State, ImportError> {
    let raw: Value = serde_json::from_str(text)?;
    sanitize_imported(&raw).ok_or(ImportError::InvalidShape)
}

pub fn apply_import(state: &mut State, clean: State) {
    *state = clean;
}

/// Entry-by-entry normalisation shared by import and load.
pub(crate) fn clean_state(body: &Map<String, Value>) -> State {
    let now = habit::now_millis();
    State {
        habits: clean_habits(body.get("habits"), now),
        logs: clean_logs(body.get("logs")),
    }
}

fn clean_habits(raw: Option<&Value>, now: i64) -> Vec<Habit> {
    let Some(Value::Array(entries)) = raw else {
        return Vec::new();
    };
    let mut seen: HashSet<String> = HashSet::new();
    let mut habits = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(fields) = entry.as_object() else {
            continue;
        };
        let Some(name) = fields
            .get("name")
            .and_then(Value::as_str)
            .and_then(habit::normalize_name)
        else {
            continue;
        };
        let id = match fields.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() && !seen.contains(id) => id.to_string(),
            _ => habit::new_habit_id(),
        };
        seen.insert(id.clone());
        habits.push(Habit {
            id,
            name,
            created_at: fields.get("createdAt").and_then(millis).unwrap_or(now),
            target_per_week: TargetPerWeek::from_json(fields.get("targetPerWeek")),
        });
    }
    habits
}

fn clean_logs(raw: Option<&Value>) -> BTreeMap<DayKey, DayLog> {
    let Some(Value::Object(entries)) = raw else {
        return BTreeMap::new();
    };
    entries
        .iter()
        .filter_map(|(key, value)| {
            let day = DayKey::parse(key)?;
            let fields = value.as_object()?;
            let completed: BTreeSet<String> = match fields.get("completed") {
                Some(Value::Array(ids)) => ids
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                _ => BTreeSet::new(),
            };
            let journal = fields
                .get("journal")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some((day, DayLog { completed, journal }))
        })
        .collect()
}

fn millis(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };
    number
        .as_i64()
        .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}
