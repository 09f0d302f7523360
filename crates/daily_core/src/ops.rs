//! State-changing actions. Each one edits the [`State`] in place and leaves
//! persistence to the caller; see [`crate::service::Tracker`].

use serde::{Deserialize, Serialize};

use crate::date::DayKey;
use crate::habit::{self, Habit, State, TargetPerWeek};
use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Flips `habit_id` in the day's completed set and returns the new
/// membership. Unknown habits are left alone and yield `None`.
pub fn toggle_completion(state: &mut State, day: DayKey, habit_id: &str) -> Option<bool> {
    state.habit(habit_id)?;
    let log = store::get_or_create_log(state, day);
    if log.completed.remove(habit_id) {
        Some(false)
    } else {
        log.completed.insert(habit_id.to_string());
        Some(true)
    }
}

/// Appends a new habit with a fresh id and the default weekly target.
/// Blank names are ignored.
pub fn add_habit(state: &mut State, name: &str) -> Option<Habit> {
    let name = habit::normalize_name(name)?;
    let created = Habit {
        id: habit::new_habit_id(),
        name,
        created_at: habit::now_millis(),
        target_per_week: TargetPerWeek::DEFAULT,
    };
    state.habits.push(created.clone());
    Some(created)
}

/// Removes the habit and scrubs its id from every day's completed set.
pub fn delete_habit(state: &mut State, habit_id: &str) -> bool {
    let removed = match state.position(habit_id) {
        Some(idx) => {
            state.habits.remove(idx);
            true
        }
        None => false,
    };
    let mut pruned = 0usize;
    for log in state.logs.values_mut() {
        if log.completed.remove(habit_id) {
            pruned += 1;
        }
    }
    tracing::debug!(%habit_id, removed, pruned, "deleted habit");
    removed
}

/// Swaps the habit with its neighbour. `false` at either end of the list or
/// for an unknown id.
pub fn reorder_habit(state: &mut State, habit_id: &str, direction: Direction) -> bool {
    let Some(idx) = state.position(habit_id) else {
        return false;
    };
    let neighbour = match direction {
        Direction::Up if idx > 0 => idx - 1,
        Direction::Down if idx + 1 < state.habits.len() => idx + 1,
        _ => return false,
    };
    state.habits.swap(idx, neighbour);
    true
}

pub fn set_target(
    state: &mut State,
    habit_id: &str,
    value: impl Into<TargetPerWeek>,
) -> Option<TargetPerWeek> {
    let habit = state.habit_mut(habit_id)?;
    habit.target_per_week = value.into();
    Some(habit.target_per_week)
}

/// Stores `text` verbatim as the day's journal.
pub fn set_journal(state: &mut State, day: DayKey, text: impl Into<String>) {
    store::get_or_create_log(state, day).journal = text.into();
}

pub fn journal(state: &State, day: DayKey) -> &str {
    store::log(state, day)
        .map(|log| log.journal.as_str())
        .unwrap_or_default()
}

pub fn reset_all(state: &mut State) {
    *state = State::new();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress;

    fn day(raw: &str) -> DayKey {
        raw.parse().unwrap()
    }

    fn state_with(names: &[&str]) -> (State, Vec<String>) {
        let mut state = State::new();
        let ids = names
            .iter()
            .map(|name| add_habit(&mut state, name).expect("habit added").id)
            .collect();
        (state, ids)
    }

    fn names(state: &State) -> Vec<&str> {
        state.habits.iter().map(|h| h.name.as_str()).collect()
    }

    #[test]
    fn toggle_flips_membership() {
        let (mut state, ids) = state_with(&["Read"]);
        let today = day("2025-10-19");
        assert_eq!(toggle_completion(&mut state, today, &ids[0]), Some(true));
        assert!(progress::is_completed(&state, today, &ids[0]));
        assert_eq!(toggle_completion(&mut state, today, &ids[0]), Some(false));
        assert!(!progress::is_completed(&state, today, &ids[0]));
    }

    #[test]
    fn toggle_unknown_habit_is_a_no_op() {
        let mut state = State::new();
        assert_eq!(toggle_completion(&mut state, day("2025-10-19"), "ghost"), None);
        assert!(state.logs.is_empty());
    }

    #[test]
    fn add_habit_trims_and_appends() {
        let (mut state, _) = state_with(&["First", "Second"]);
        let added = add_habit(&mut state, "   Third  ").unwrap();
        assert_eq!(added.name, "Third");
        assert_eq!(added.target_per_week, TargetPerWeek::DEFAULT);
        assert!(added.created_at > 0);
        assert_eq!(names(&state), vec!["First", "Second", "Third"]);
    }

    #[test]
    fn add_habit_rejects_blank_names() {
        let mut state = State::new();
        assert!(add_habit(&mut state, "").is_none());
        assert!(add_habit(&mut state, " \t\n").is_none());
        assert!(state.habits.is_empty());
    }

    #[test]
    fn add_habit_assigns_unique_ids() {
        let (state, ids) = state_with(&["Same", "Same", "Same"]);
        assert_eq!(state.habits.len(), 3);
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert_ne!(ids[0], ids[2]);
    }

    #[test]
    fn delete_cascades_through_every_log() {
        let (mut state, ids) = state_with(&["Doomed", "Keeper"]);
        let (doomed, keeper) = (&ids[0], &ids[1]);
        let days = [
            "2025-10-13",
            "2025-10-14",
            "2025-10-16",
            "2025-10-18",
            "2025-10-19",
        ];
        for raw in days {
            toggle_completion(&mut state, day(raw), doomed);
            toggle_completion(&mut state, day(raw), keeper);
        }

        assert!(delete_habit(&mut state, doomed));

        assert_eq!(names(&state), vec!["Keeper"]);
        for log in state.logs.values() {
            assert!(!log.completed.contains(doomed.as_str()));
        }
        for raw in days {
            assert!(progress::is_completed(&state, day(raw), keeper));
        }
    }

    #[test]
    fn delete_unknown_habit_still_prunes_dangling_ids() {
        let mut state = State::new();
        store::get_or_create_log(&mut state, day("2025-10-19"))
            .completed
            .insert("dangling".into());
        assert!(!delete_habit(&mut state, "dangling"));
        assert!(state.logs[&day("2025-10-19")].completed.is_empty());
    }

    #[test]
    fn reorder_swaps_neighbours() {
        let (mut state, ids) = state_with(&["A", "B", "C"]);
        assert!(reorder_habit(&mut state, &ids[1], Direction::Up));
        assert_eq!(names(&state), vec!["B", "A", "C"]);
        assert!(reorder_habit(&mut state, &ids[1], Direction::Down));
        assert!(reorder_habit(&mut state, &ids[1], Direction::Down));
        assert_eq!(names(&state), vec!["A", "C", "B"]);
    }

    #[test]
    fn reorder_is_a_no_op_at_the_edges() {
        let (mut state, ids) = state_with(&["A", "B", "C"]);
        assert!(!reorder_habit(&mut state, &ids[0], Direction::Up));
        assert!(!reorder_habit(&mut state, &ids[2], Direction::Down));
        assert!(!reorder_habit(&mut state, "ghost", Direction::Up));
        assert_eq!(names(&state), vec!["A", "B", "C"]);
    }

    #[test]
    fn set_target_clamps_every_kind_of_input() {
        let (mut state, ids) = state_with(&["Run"]);
        let id = &ids[0];
        assert_eq!(set_target(&mut state, id, 0_i64).map(TargetPerWeek::get), Some(1));
        assert_eq!(set_target(&mut state, id, 9_i64).map(TargetPerWeek::get), Some(7));
        assert_eq!(set_target(&mut state, id, 3_i64).map(TargetPerWeek::get), Some(3));
        assert_eq!(set_target(&mut state, id, "abc").map(TargetPerWeek::get), Some(7));
        assert_eq!(set_target(&mut state, id, 4.5).map(TargetPerWeek::get), Some(5));
        assert_eq!(set_target(&mut state, id, f64::NAN).map(TargetPerWeek::get), Some(7));
        assert_eq!(state.habits[0].target_per_week.get(), 7);
        assert_eq!(set_target(&mut state, "ghost", 3_i64), None);
    }

    #[test]
    fn journal_is_stored_verbatim() {
        let mut state = State::new();
        let today = day("2025-10-19");
        assert_eq!(journal(&state, today), "");
        set_journal(&mut state, today, "  A small win was…\n");
        assert_eq!(journal(&state, today), "  A small win was…\n");
        set_journal(&mut state, today, "");
        assert_eq!(journal(&state, today), "");
        assert_eq!(state.logs.len(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let (mut state, ids) = state_with(&["A"]);
        toggle_completion(&mut state, day("2025-10-19"), &ids[0]);
        reset_all(&mut state);
        assert_eq!(state, State::new());
    }
}
