use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::date::DayKey;
use crate::habit::{DayLog, State};
use crate::{migrate, sanitize};

pub const DEFAULT_STATE_FILE: &str = "quiet_daily_state.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("storage slot `{slot}` failed: {source}")]
    Io {
        slot: String,
        #[source]
        source: io::Error,
    },
}

/// A single named place that holds the serialized state blob.
pub trait StorageSlot: Send + Sync {
    fn describe(&self) -> String;
    /// `Ok(None)` when nothing has been stored yet.
    fn read(&self) -> io::Result<Option<String>>;
    /// Replaces the whole blob; partial writes must never become visible.
    fn write(&self, blob: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

/// JSON file on disk, replaced through a temp file and rename.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(DEFAULT_STATE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageSlot for FileSlot {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write(&self, blob: &str) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(blob.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

/// In-process slot. Can be told to reject writes, which is how hosts without
/// durable storage (and tests) exercise the failure path.
#[derive(Debug, Default)]
pub struct MemorySlot {
    blob: Mutex<Option<String>>,
    reject_writes: AtomicBool,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
            reject_writes: AtomicBool::new(false),
        }
    }

    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn contents(&self) -> Option<String> {
        self.blob.lock().clone()
    }
}

impl StorageSlot for MemorySlot {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn read(&self) -> io::Result<Option<String>> {
        Ok(self.blob.lock().clone())
    }

    fn write(&self, blob: &str) -> io::Result<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "storage quota exceeded"));
        }
        *self.blob.lock() = Some(blob.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "storage is read-only",
            ));
        }
        *self.blob.lock() = None;
        Ok(())
    }
}

#[derive(Serialize)]
struct PersistedBlob<'a> {
    #[serde(rename = "schemaVersion")]
    schema_version: u64,
    #[serde(flatten)]
    state: &'a State,
}

/// Reads the slot. Anything missing, unreadable or structurally wrong comes
/// back as an empty state.
pub fn load(slot: &dyn StorageSlot) -> State {
    match slot.read() {
        Ok(Some(raw)) => decode(&raw).unwrap_or_else(|| {
            tracing::warn!(slot = %slot.describe(), "discarding unreadable state blob");
            State::new()
        }),
        Ok(None) => {
            tracing::debug!(slot = %slot.describe(), "no stored state, starting empty");
            State::new()
        }
        Err(err) => {
            tracing::warn!(slot = %slot.describe(), %err, "unable to read state, starting empty");
            State::new()
        }
    }
}

/// Parses a stored blob, runs migrations and normalises every entry.
pub fn decode(raw: &str) -> Option<State> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let Value::Object(blob) = value else {
        return None;
    };
    if !has_field(&blob, "habits") || !has_field(&blob, "logs") {
        return None;
    }
    let blob = migrate::upgrade(blob);
    Some(sanitize::clean_state(&blob))
}

pub fn encode(state: &State) -> Result<String, StoreError> {
    let blob = PersistedBlob {
        schema_version: migrate::CURRENT_SCHEMA_VERSION,
        state,
    };
    Ok(serde_json::to_string(&blob)?)
}

pub fn save(slot: &dyn StorageSlot, state: &State) -> Result<(), StoreError> {
    let blob = encode(state)?;
    slot.write(&blob).map_err(|source| StoreError::Io {
        slot: slot.describe(),
        source,
    })?;
    tracing::debug!(
        slot = %slot.describe(),
        habits = state.habits.len(),
        days = state.logs.len(),
        "state saved"
    );
    Ok(())
}

pub fn erase(slot: &dyn StorageSlot) -> Result<(), StoreError> {
    slot.clear().map_err(|source| StoreError::Io {
        slot: slot.describe(),
        source,
    })
}

/// Read-only view of a day. Never inserts.
pub fn log(state: &State, day: DayKey) -> Option<&DayLog> {
    state.logs.get(&day)
}

/// The only place a [`DayLog`] is created.
pub fn get_or_create_log(state: &mut State, day: DayKey) -> &mut DayLog {
    state.logs.entry(day).or_default()
}

fn has_field(blob: &serde_json::Map<String, Value>, field: &str) -> bool {
    !matches!(blob.get(field), None | Some(Value::Null) | Some(Value::Bool(false)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::{Habit, TargetPerWeek};
    use serde_json::json;
    use tempfile::tempdir;

    fn day(raw: &str) -> DayKey {
        raw.parse().unwrap()
    }

    fn sample_state() -> State {
        let mut state = State::new();
        state.habits.push(Habit {
            id: "h-read".into(),
            name: "Read".into(),
            created_at: 1_760_000_000_000,
            target_per_week: TargetPerWeek::clamped(3.0),
        });
        state.habits.push(Habit {
            id: "h-walk".into(),
            name: "Walk".into(),
            created_at: 1_760_000_100_000,
            target_per_week: TargetPerWeek::DEFAULT,
        });
        let log = get_or_create_log(&mut state, day("2025-10-18"));
        log.completed.insert("h-read".into());
        log.journal = "Quiet morning.".into();
        get_or_create_log(&mut state, day("2025-10-19"))
            .completed
            .insert("h-walk".into());
        state
    }

    #[test]
    fn load_degrades_to_empty_state() {
        for blob in [
            "",
            "not json {{{",
            "[]",
            "42",
            r#"{"habits": []}"#,
            r#"{"logs": {}}"#,
            r#"{"habits": null, "logs": {}}"#,
        ] {
            let slot = MemorySlot::with_blob(blob);
            assert_eq!(load(&slot), State::new(), "blob {blob:?}");
        }
        assert_eq!(load(&MemorySlot::new()), State::new());
    }

    #[test]
    fn load_clamps_targets_from_older_schema() {
        let slot = MemorySlot::with_blob(
            json!({
                "habits": [
                    {"id": "a", "name": "Stretch", "createdAt": 1},
                    {"id": "b", "name": "Run", "createdAt": 2, "targetPerWeek": 0},
                    {"id": "c", "name": "Swim", "createdAt": 3, "targetPerWeek": 11}
                ],
                "logs": {}
            })
            .to_string(),
        );
        let state = load(&slot);
        let targets: Vec<u8> = state
            .habits
            .iter()
            .map(|habit| habit.target_per_week.get())
            .collect();
        assert_eq!(targets, vec![7, 1, 7]);
    }

    #[test]
    fn load_drops_malformed_day_keys() {
        let slot = MemorySlot::with_blob(
            json!({
                "habits": [],
                "logs": {
                    "2025-10-19": {"completed": [], "journal": "ok"},
                    "2025-10-19T08:00": {"completed": [], "journal": "bad"},
                    "yesterday": {"completed": [], "journal": "bad"}
                }
            })
            .to_string(),
        );
        let state = load(&slot);
        assert_eq!(state.logs.len(), 1);
        assert_eq!(state.logs[&day("2025-10-19")].journal, "ok");
    }

    #[test]
    fn save_then_load_is_idempotent() {
        let slot = MemorySlot::new();
        save(&slot, &sample_state()).unwrap();

        let first = load(&slot);
        save(&slot, &first).unwrap();
        let second = load(&slot);
        assert_eq!(first, second);
        assert_eq!(first, sample_state());
    }

    #[test]
    fn saved_blob_carries_schema_version() {
        let slot = MemorySlot::new();
        save(&slot, &State::new()).unwrap();
        let value: Value = serde_json::from_str(&slot.contents().unwrap()).unwrap();
        assert_eq!(value["schemaVersion"], json!(migrate::CURRENT_SCHEMA_VERSION));
        assert_eq!(value["habits"], json!([]));
        assert_eq!(value["logs"], json!({}));
    }

    #[test]
    fn rejected_write_is_reported() {
        let slot = MemorySlot::new();
        slot.set_reject_writes(true);
        let err = save(&slot, &sample_state()).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(slot.contents().is_none());
    }

    #[test]
    fn file_slot_round_trip_and_clear() {
        let temp = tempdir().unwrap();
        let slot = FileSlot::in_dir(temp.path().join("nested"));
        assert_eq!(slot.read().unwrap(), None);

        save(&slot, &sample_state()).unwrap();
        assert!(slot.path().exists());
        assert_eq!(load(&slot), sample_state());

        erase(&slot).unwrap();
        assert!(!slot.path().exists());
        erase(&slot).unwrap();
        assert_eq!(load(&slot), State::new());
    }

    #[test]
    fn read_path_does_not_create_logs() {
        let state = sample_state();
        assert!(log(&state, day("2025-01-01")).is_none());
        assert_eq!(state.logs.len(), 2);
    }

    #[test]
    fn get_or_create_log_inserts_once() {
        let mut state = State::new();
        get_or_create_log(&mut state, day("2025-10-19")).journal = "hi".into();
        let again = get_or_create_log(&mut state, day("2025-10-19"));
        assert_eq!(again.journal, "hi");
        assert!(again.completed.is_empty());
        assert_eq!(state.logs.len(), 1);
    }
}
