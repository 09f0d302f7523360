use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use daily_core::{
    date,
    offline::StaticCacheVersion,
    progress::{HabitSnapshot, WeekSummary},
    store::DEFAULT_STATE_FILE,
    DayKey, Habit, TargetPerWeek, Tracker,
};
use serde_json::json;
use tracing::{debug, info};

use crate::cli::{Cli, Command, DateArgs};

pub const STATE_FILE_ENV: &str = "QUIET_DAILY_STATE_FILE";
pub const DATA_DIR_ENV: &str = "QUIET_DAILY_DATA_DIR";
pub const CACHE_VERSION_ENV: &str = "QUIET_DAILY_CACHE_VERSION";

const APP_DIR_NAME: &str = "quiet-daily";
const SHORT_ID_LEN: usize = 8;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) state_file: PathBuf,
    pub(crate) cache_version: Option<String>,
    pub(crate) json: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_vars(|key| std::env::var(key).ok()))
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(dir) = non_empty(DATA_DIR_ENV) {
            config.state_file = PathBuf::from(dir).join(DEFAULT_STATE_FILE);
        } else if let Some(dir) = default_data_dir(&non_empty) {
            config.state_file = dir.join(DEFAULT_STATE_FILE);
        }
        if let Some(file) = non_empty(STATE_FILE_ENV) {
            config.state_file = PathBuf::from(file);
        }
        config.cache_version = non_empty(CACHE_VERSION_ENV);
        debug!(state_file = %config.state_file.display(), "configuration resolved");
        config
    }

    /// Command-line flags win over the environment.
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if let Some(path) = &cli.state_file {
            self.state_file = path.clone();
        }
        self.json = cli.json;
        self
    }

    pub fn with_state_file(mut self, path: impl AsRef<Path>) -> Self {
        self.state_file = path.as_ref().to_path_buf();
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            cache_version: None,
            json: false,
        }
    }
}

fn default_data_dir(lookup: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(xdg) = lookup("XDG_DATA_HOME") {
        return Some(PathBuf::from(xdg).join(APP_DIR_NAME));
    }
    lookup("HOME").map(|home| {
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR_NAME)
    })
}

pub fn build_tracker(config: &AppConfig) -> Tracker {
    let mut builder = Tracker::builder().with_state_file(&config.state_file);
    if let Some(version) = &config.cache_version {
        builder = builder.with_cache_version_source(Box::new(StaticCacheVersion::new(version)));
    }
    builder.build()
}

pub fn run(config: AppConfig, command: Command, out: &mut dyn Write) -> Result<()> {
    info!(state_file = %config.state_file.display(), "starting");
    let tracker = build_tracker(&config);
    let json = config.json;

    match command {
        Command::Today(args) => {
            let day = resolve_day(&args);
            print_today(&tracker, day, json, out)?;
        }
        Command::Add { name } => {
            let name = name.join(" ");
            match tracker.add_habit(&name)? {
                Some(habit) => writeln!(out, "added {} ({})", habit.name, short_id(&habit.id))?,
                None => bail!("habit name cannot be blank"),
            }
        }
        Command::Toggle { habit, date } => {
            let day = resolve_day(&date);
            let habit = resolve_habit(&tracker.habits(), &habit)?;
            let done = tracker
                .toggle_completion(day, &habit.id)?
                .context("habit disappeared while toggling")?;
            let streak = tracker.streak(day, &habit.id);
            if done {
                writeln!(out, "{} done on {day}, streak {streak}", habit.name)?;
            } else {
                writeln!(out, "{} not done on {day}", habit.name)?;
            }
        }
        Command::Delete { habit } => {
            let habit = resolve_habit(&tracker.habits(), &habit)?;
            tracker.delete_habit(&habit.id)?;
            writeln!(out, "deleted {}", habit.name)?;
        }
        Command::Move { habit, direction } => {
            let habit = resolve_habit(&tracker.habits(), &habit)?;
            if !tracker.reorder_habit(&habit.id, direction.into())? {
                writeln!(out, "{} is already at the edge of the list", habit.name)?;
            }
            print_habit_list(&tracker.habits(), out)?;
        }
        Command::Target { habit, value } => {
            let habit = resolve_habit(&tracker.habits(), &habit)?;
            let target = tracker
                .set_target(&habit.id, TargetPerWeek::parse(&value))?
                .context("habit disappeared while setting target")?;
            writeln!(out, "{} target: {target} days per week", habit.name)?;
        }
        Command::Journal { date, text } => {
            let day = resolve_day(&date);
            if let Some(text) = text {
                tracker.set_journal(day, &text)?;
            }
            let entry = tracker.journal(day);
            if json {
                let payload = json!({
                    "day": day,
                    "prompt": tracker.prompt_for(day),
                    "journal": entry,
                });
                writeln!(out, "{}", serde_json::to_string_pretty(&payload)?)?;
            } else {
                writeln!(out, "{day}  {}", tracker.prompt_for(day))?;
                writeln!(out, "{entry}")?;
            }
        }
        Command::Week(args) => {
            let day = resolve_day(&args);
            let summary = tracker.week_summary(day);
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
            } else {
                print_week(&tracker, &summary, out)?;
            }
        }
        Command::Export { out: target } => {
            let payload = tracker.export_json()?;
            match target {
                Some(path) => {
                    fs::write(&path, payload)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    writeln!(out, "exported to {}", path.display())?;
                }
                None => writeln!(out, "{payload}")?,
            }
        }
        Command::Import { file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let summary = tracker
                .import_json(&text)
                .with_context(|| format!("could not import {}", file.display()))?;
            writeln!(
                out,
                "imported {} habits across {} days",
                summary.habits, summary.days
            )?;
        }
        Command::Reset { yes } => {
            if !yes {
                bail!("reset erases every habit and journal entry; re-run with --yes to confirm");
            }
            tracker.reset_all()?;
            writeln!(out, "all data erased")?;
        }
        Command::Version => {
            writeln!(
                out,
                "quiet_daily {} (cache: {})",
                env!("CARGO_PKG_VERSION"),
                tracker.cache_version()
            )?;
        }
    }
    Ok(())
}

fn resolve_day(args: &DateArgs) -> DayKey {
    args.date.unwrap_or_else(date::today)
}

/// Finds a habit by exact id, then by case-insensitive name, then by unique
/// id prefix.
pub fn resolve_habit(habits: &[Habit], query: &str) -> Result<Habit> {
    let query = query.trim();
    if query.is_empty() {
        bail!("no habit given");
    }
    if let Some(habit) = habits.iter().find(|habit| habit.id == query) {
        return Ok(habit.clone());
    }
    let by_name: Vec<&Habit> = habits
        .iter()
        .filter(|habit| habit.name.eq_ignore_ascii_case(query))
        .collect();
    match by_name.as_slice() {
        [habit] => return Ok((*habit).clone()),
        [] => {}
        _ => bail!("more than one habit is named `{query}`; use its id"),
    }
    let by_prefix: Vec<&Habit> = habits
        .iter()
        .filter(|habit| habit.id.starts_with(query))
        .collect();
    match by_prefix.as_slice() {
        [habit] => Ok((*habit).clone()),
        [] => bail!("no habit matches `{query}`"),
        _ => bail!("`{query}` matches more than one habit id"),
    }
}

fn short_id(id: &str) -> &str {
    id.char_indices()
        .nth(SHORT_ID_LEN)
        .map(|(idx, _)| &id[..idx])
        .unwrap_or(id)
}

fn name_width<'a>(names: impl Iterator<Item = &'a str>) -> usize {
    names.map(|name| name.chars().count()).max().unwrap_or(0)
}

fn print_today(tracker: &Tracker, day: DayKey, json: bool, out: &mut dyn Write) -> Result<()> {
    let rows: Vec<HabitSnapshot> = tracker.today_overview(day);
    let journal = tracker.journal(day);
    if json {
        let payload = json!({
            "day": day,
            "prompt": tracker.prompt_for(day),
            "habits": rows,
            "journal": journal,
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&payload)?)?;
        return Ok(());
    }

    writeln!(out, "{day}  {}", tracker.prompt_for(day))?;
    if rows.is_empty() {
        writeln!(out, "no habits yet; add one with `quiet_daily add <name>`")?;
    }
    let width = name_width(rows.iter().map(|row| row.name.as_str()));
    for row in &rows {
        let mark = if row.completed { "x" } else { " " };
        writeln!(
            out,
            "[{mark}] {:<width$}  streak {:>3}  {}",
            row.name,
            row.streak,
            short_id(&row.id),
        )?;
    }
    if !journal.is_empty() {
        writeln!(out)?;
        writeln!(out, "{journal}")?;
    }
    Ok(())
}

fn print_week(tracker: &Tracker, summary: &WeekSummary, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "week of {}", summary.start)?;
    let width = name_width(summary.habits.iter().map(|row| row.name.as_str()));
    for row in &summary.habits {
        let marks: String = summary
            .days
            .iter()
            .map(|day| {
                if tracker.is_completed(*day, &row.habit_id) {
                    'x'
                } else {
                    '.'
                }
            })
            .collect();
        writeln!(
            out,
            "{:<width$}  {marks}  {}/{}  {:>3}%",
            row.name, row.count, row.target_per_week, row.percent,
        )?;
    }
    Ok(())
}

fn print_habit_list(habits: &[Habit], out: &mut dyn Write) -> Result<()> {
    for (idx, habit) in habits.iter().enumerate() {
        writeln!(out, "{:>2}. {}", idx + 1, habit.name)?;
    }
    Ok(())
}
