pub mod date;
pub mod habit;
pub mod journal;
pub mod migrate;
pub mod offline;
pub mod ops;
pub mod progress;
pub mod sanitize;
pub mod service;
pub mod store;

pub use crate::date::DayKey;
pub use crate::habit::{DayLog, Habit, State, TargetPerWeek};
pub use crate::ops::Direction;
pub use crate::service::{ImportSummary, Tracker, TrackerBuilder, TrackerError};
