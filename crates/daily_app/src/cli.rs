use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use daily_core::{DayKey, Direction};

#[derive(Parser, Debug)]
#[command(
    name = "quiet_daily",
    about = "Quiet Daily: habits, streaks and a short journal, kept on this device",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Use this state file instead of the configured one
    #[arg(long = "state", global = true, value_name = "PATH")]
    pub state_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show the day's habits, streaks and journal prompt (default)
    Today(DateArgs),
    /// Add a habit at the end of the list
    Add {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// Mark a habit done, or undo it
    Toggle {
        habit: String,
        #[command(flatten)]
        date: DateArgs,
    },
    /// Delete a habit and its completion history
    Delete { habit: String },
    /// Move a habit one place up or down
    Move { habit: String, direction: MoveDirection },
    /// Set how many days per week a habit should be done (1-7)
    Target {
        habit: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Show the journal entry for a day, or replace it
    Journal {
        #[command(flatten)]
        date: DateArgs,
        text: Option<String>,
    },
    /// Weekly progress for the Monday-start week containing the day
    Week(DateArgs),
    /// Write a backup of everything
    Export {
        /// Write to a file instead of stdout
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Replace everything with the contents of a backup file
    Import { file: PathBuf },
    /// Erase all habits, completions and journal entries
    Reset {
        /// Confirm the erase
        #[arg(long)]
        yes: bool,
    },
    /// Show the app version and the active offline cache version
    Version,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DateArgs {
    /// Day to act on (YYYY-MM-DD); defaults to today
    #[arg(long, value_parser = parse_day_key, value_name = "YYYY-MM-DD")]
    pub date: Option<DayKey>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

impl From<MoveDirection> for Direction {
    fn from(value: MoveDirection) -> Self {
        match value {
            MoveDirection::Up => Direction::Up,
            MoveDirection::Down => Direction::Down,
        }
    }
}

fn parse_day_key(raw: &str) -> Result<DayKey, String> {
    raw.parse::<DayKey>().map_err(|err| err.to_string())
}
