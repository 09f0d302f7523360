use std::io;

use clap::Parser;
use daily_app::app::{run, AppConfig};
use daily_app::cli::{Cli, Command, DateArgs};
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let config = AppConfig::from_env().unwrap_or_default().apply_cli(&cli);
    let command = cli
        .command
        .unwrap_or_else(|| Command::Today(DateArgs::default()));

    let mut stdout = io::stdout().lock();
    if let Err(err) = run(config, command, &mut stdout) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

// Logs go to stderr so command output stays pipeable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("QUIET_DAILY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
