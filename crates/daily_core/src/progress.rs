use serde::Serialize;

use crate::date::{self, DayKey};
use crate::habit::{State, TargetPerWeek};
use crate::store;

/// One habit as shown on the "today" list.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HabitSnapshot {
    pub id: String,
    pub name: String,
    pub target_per_week: TargetPerWeek,
    pub completed: bool,
    pub streak: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyProgress {
    pub habit_id: String,
    pub name: String,
    pub count: u32,
    pub target_per_week: TargetPerWeek,
    pub percent: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WeekSummary {
    pub start: DayKey,
    pub days: [DayKey; 7],
    pub habits: Vec<WeeklyProgress>,
}

pub fn is_completed(state: &State, day: DayKey, habit_id: &str) -> bool {
    store::log(state, day).is_some_and(|log| log.completed.contains(habit_id))
}

/// Current streak: consecutive completed days ending at `today`. A habit not
/// done on `today` has a streak of 0 whatever happened before.
pub fn streak(state: &State, today: DayKey, habit_id: &str) -> u32 {
    let mut count = 0;
    let mut cursor = today;
    while is_completed(state, cursor, habit_id) {
        count += 1;
        let previous = date::add_days(cursor, -1);
        if previous == cursor {
            break;
        }
        cursor = previous;
    }
    count
}

/// Completions over the seven days beginning at `week_start`.
pub fn weekly_count(state: &State, week_start: DayKey, habit_id: &str) -> u32 {
    date::week_days(week_start)
        .iter()
        .filter(|day| is_completed(state, **day, habit_id))
        .count() as u32
}

/// `round(100 * count / target)`, capped at 100.
pub fn weekly_progress_pct(count: u32, target: TargetPerWeek) -> u32 {
    let target = f64::from(target.get().max(TargetPerWeek::MIN));
    let pct = (100.0 * f64::from(count) / target).round();
    (pct as u32).min(100)
}

pub fn today_overview(state: &State, today: DayKey) -> Vec<HabitSnapshot> {
    state
        .habits
        .iter()
        .map(|habit| HabitSnapshot {
            id: habit.id.clone(),
            name: habit.name.clone(),
            target_per_week: habit.target_per_week,
            completed: is_completed(state, today, &habit.id),
            streak: streak(state, today, &habit.id),
        })
        .collect()
}

/// Progress for the Monday-start week containing `any_day`.
pub fn week_summary(state: &State, any_day: DayKey) -> WeekSummary {
    let start = date::week_start(any_day);
    let habits = state
        .habits
        .iter()
        .map(|habit| {
            let count = weekly_count(state, start, &habit.id);
            WeeklyProgress {
                habit_id: habit.id.clone(),
                name: habit.name.clone(),
                count,
                target_per_week: habit.target_per_week,
                percent: weekly_progress_pct(count, habit.target_per_week),
            }
        })
        .collect();
    WeekSummary {
        start,
        days: date::week_days(start),
        habits,
    }
}
