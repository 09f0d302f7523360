use std::path::Path;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::{
    date::DayKey,
    habit::{Habit, State, TargetPerWeek},
    journal,
    offline::{self, CacheVersionSource},
    ops::{self, Direction},
    progress::{self, HabitSnapshot, WeekSummary},
    sanitize::{self, ExportEnvelope, ImportError},
    store::{self, FileSlot, MemorySlot, StorageSlot, StoreError},
};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Import(#[from] ImportError),
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub habits: usize,
    pub days: usize,
}

/// Owns the session's [`State`] and its storage slot. Every mutation is
/// applied and saved under one write lock; if the save fails the state is
/// put back as it was and the error is returned.
pub struct Tracker {
    state: RwLock<State>,
    slot: Box<dyn StorageSlot>,
    cache_source: Option<Box<dyn CacheVersionSource>>,
}

pub struct TrackerBuilder {
    slot: Option<Box<dyn StorageSlot>>,
    cache_source: Option<Box<dyn CacheVersionSource>>,
}

impl TrackerBuilder {
    pub fn new() -> Self {
        Self {
            slot: None,
            cache_source: None,
        }
    }

    pub fn with_slot(mut self, slot: Box<dyn StorageSlot>) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn with_state_file(self, path: impl AsRef<Path>) -> Self {
        self.with_slot(Box::new(FileSlot::new(path)))
    }

    pub fn with_cache_version_source(mut self, source: Box<dyn CacheVersionSource>) -> Self {
        self.cache_source = Some(source);
        self
    }

    /// Loads whatever the slot holds. Without a slot the tracker keeps its
    /// state in memory only.
    pub fn build(self) -> Tracker {
        let slot = self
            .slot
            .unwrap_or_else(|| Box::new(MemorySlot::new()));
        let state = store::load(slot.as_ref());
        tracing::info!(
            slot = %slot.describe(),
            habits = state.habits.len(),
            days = state.logs.len(),
            "tracker ready"
        );
        Tracker {
            state: RwLock::new(state),
            slot,
            cache_source: self.cache_source,
        }
    }
}

impl Default for TrackerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker {
    pub fn builder() -> TrackerBuilder {
        TrackerBuilder::new()
    }

    pub fn snapshot(&self) -> State {
        self.state.read().clone()
    }

    pub fn habits(&self) -> Vec<Habit> {
        self.state.read().habits.clone()
    }

    pub fn is_completed(&self, day: DayKey, habit_id: &str) -> bool {
        progress::is_completed(&self.state.read(), day, habit_id)
    }

    pub fn streak(&self, today: DayKey, habit_id: &str) -> u32 {
        progress::streak(&self.state.read(), today, habit_id)
    }

    pub fn weekly_count(&self, week_start: DayKey, habit_id: &str) -> u32 {
        progress::weekly_count(&self.state.read(), week_start, habit_id)
    }

    pub fn weekly_progress_pct(&self, count: u32, target: TargetPerWeek) -> u32 {
        progress::weekly_progress_pct(count, target)
    }

    pub fn journal(&self, day: DayKey) -> String {
        ops::journal(&self.state.read(), day).to_string()
    }

    pub fn today_overview(&self, today: DayKey) -> Vec<HabitSnapshot> {
        progress::today_overview(&self.state.read(), today)
    }

    pub fn week_summary(&self, any_day: DayKey) -> WeekSummary {
        progress::week_summary(&self.state.read(), any_day)
    }

    pub fn prompt_for(&self, day: DayKey) -> &'static str {
        journal::prompt_for(day)
    }

    pub fn cache_version(&self) -> String {
        offline::describe_cache_version(self.cache_source.as_deref())
    }

    pub fn export_snapshot(&self) -> ExportEnvelope {
        sanitize::export_snapshot(&self.state.read(), Utc::now())
    }

    pub fn export_json(&self) -> Result<String, TrackerError> {
        let envelope = self.export_snapshot();
        let json = serde_json::to_string_pretty(&envelope).map_err(StoreError::from)?;
        Ok(json)
    }

    #[instrument(skip(self))]
    pub fn toggle_completion(
        &self,
        day: DayKey,
        habit_id: &str,
    ) -> Result<Option<bool>, TrackerError> {
        self.mutate(|state| ops::toggle_completion(state, day, habit_id))
    }

    #[instrument(skip(self))]
    pub fn add_habit(&self, name: &str) -> Result<Option<Habit>, TrackerError> {
        self.mutate(|state| ops::add_habit(state, name))
    }

    #[instrument(skip(self))]
    pub fn delete_habit(&self, habit_id: &str) -> Result<bool, TrackerError> {
        self.mutate(|state| ops::delete_habit(state, habit_id))
    }

    #[instrument(skip(self))]
    pub fn reorder_habit(&self, habit_id: &str, direction: Direction) -> Result<bool, TrackerError> {
        self.mutate(|state| ops::reorder_habit(state, habit_id, direction))
    }

    #[instrument(skip(self, value))]
    pub fn set_target(
        &self,
        habit_id: &str,
        value: impl Into<TargetPerWeek>,
    ) -> Result<Option<TargetPerWeek>, TrackerError> {
        let target = value.into();
        self.mutate(|state| ops::set_target(state, habit_id, target))
    }

    #[instrument(skip(self, text))]
    pub fn set_journal(&self, day: DayKey, text: &str) -> Result<(), TrackerError> {
        self.mutate(|state| ops::set_journal(state, day, text))
    }

    /// Replaces everything with the sanitized contents of `text`.
    #[instrument(skip(self, text))]
    pub fn import_json(&self, text: &str) -> Result<ImportSummary, TrackerError> {
        let clean = sanitize::parse_import(text)?;
        self.apply_import(clean)
    }

    pub fn import_value(&self, raw: &Value) -> Result<ImportSummary, TrackerError> {
        let clean = sanitize::sanitize_imported(raw).ok_or(ImportError::InvalidShape)?;
        self.apply_import(clean)
    }

    /// Erases the stored blob and starts over. Confirming with the user is the
    /// caller's job.
    #[instrument(skip(self))]
    pub fn reset_all(&self) -> Result<(), TrackerError> {
        let mut state = self.state.write();
        store::erase(self.slot.as_ref())?;
        ops::reset_all(&mut state);
        tracing::info!("all data erased");
        Ok(())
    }

    fn apply_import(&self, clean: State) -> Result<ImportSummary, TrackerError> {
        let summary = ImportSummary {
            habits: clean.habits.len(),
            days: clean.logs.len(),
        };
        self.mutate(|state| sanitize::apply_import(state, clean))?;
        tracing::info!(habits = summary.habits, days = summary.days, "import applied");
        Ok(summary)
    }

    fn mutate<T>(&self, op: impl FnOnce(&mut State) -> T) -> Result<T, TrackerError> {
        let mut state = self.state.write();
        let before = state.clone();
        let outcome = op(&mut state);
        if let Err(err) = store::save(self.slot.as_ref(), &state) {
            tracing::warn!(%err, "save failed, rolling back");
            *state = before;
            return Err(err.into());
        }
        Ok(outcome)
    }
}
