use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::date::DayKey;

pub const MAX_NAME_CHARS: usize = 40;

/// Days per Monday-start week a habit is expected to be done, always 1..=7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TargetPerWeek(u8);

impl TargetPerWeek {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 7;
    pub const DEFAULT: TargetPerWeek = TargetPerWeek(Self::MAX);

    /// Rounds to the nearest integer and clamps into 1..=7. Non-finite input
    /// falls back to 7.
    pub fn clamped(value: f64) -> Self {
        if !value.is_finite() {
            return Self::DEFAULT;
        }
        let rounded = value.round().clamp(Self::MIN as f64, Self::MAX as f64);
        Self(rounded as u8)
    }

    /// Same policy for free text; anything that does not parse as a number
    /// becomes 7.
    pub fn parse(input: &str) -> Self {
        input
            .trim()
            .parse::<f64>()
            .map(Self::clamped)
            .unwrap_or(Self::DEFAULT)
    }

    /// Same policy for arbitrary JSON: numbers and numeric strings are
    /// clamped, everything else defaults.
    pub fn from_json(value: Option<&serde_json::Value>) -> Self {
        match value {
            Some(serde_json::Value::Number(n)) => {
                n.as_f64().map(Self::clamped).unwrap_or_default()
            }
            Some(serde_json::Value::String(s)) => Self::parse(s),
            _ => Self::DEFAULT,
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for TargetPerWeek {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<f64> for TargetPerWeek {
    fn from(value: f64) -> Self {
        Self::clamped(value)
    }
}

impl From<i64> for TargetPerWeek {
    fn from(value: i64) -> Self {
        Self::clamped(value as f64)
    }
}

impl From<i32> for TargetPerWeek {
    fn from(value: i32) -> Self {
        Self::clamped(f64::from(value))
    }
}

impl From<&str> for TargetPerWeek {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for TargetPerWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for TargetPerWeek {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_json(Some(&value)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    #[serde(default)]
    pub target_per_week: TargetPerWeek,
}

/// One day's completions and journal text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayLog {
    #[serde(default)]
    pub completed: BTreeSet<String>,
    #[serde(default)]
    pub journal: String,
}

impl DayLog {
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.journal.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct State {
    pub habits: Vec<Habit>,
    pub logs: BTreeMap<DayKey, DayLog>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn habit(&self, habit_id: &str) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == habit_id)
    }

    pub fn habit_mut(&mut self, habit_id: &str) -> Option<&mut Habit> {
        self.habits.iter_mut().find(|habit| habit.id == habit_id)
    }

    pub fn position(&self, habit_id: &str) -> Option<usize> {
        self.habits.iter().position(|habit| habit.id == habit_id)
    }
}

/// Trims and cuts a habit name to [`MAX_NAME_CHARS`] characters. Returns
/// `None` when nothing is left.
pub fn normalize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cut: String = trimmed.chars().take(MAX_NAME_CHARS).collect();
    // A cut can expose trailing whitespace from the middle of the name.
    let cut = cut.trim_end().to_string();
    if cut.is_empty() {
        None
    } else {
        Some(cut)
    }
}

pub fn new_habit_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
