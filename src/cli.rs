use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;
use crate::config::{DB_ENV, USER_ENV};

/// File-backed personal task manager that ranks tasks by due-date urgency.
/// Storage defaults to ~/.taskrank/tasks.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "tk", version, about = "Rank, nest and schedule personal tasks")]
pub struct Cli {
    /// Path to the JSON database file.
    #[arg(long, global = true, env = DB_ENV)]
    pub db: Option<PathBuf>,

    /// Owner whose tasks are shown and created.
    #[arg(long, global = true, env = USER_ENV)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}
