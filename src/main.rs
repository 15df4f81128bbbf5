//! # taskrank - personal task manager
//!
//! A command-line task manager for nested personal tasks that ranks work by
//! how soon it is due and how much it matters.
//!
//! ## Key Features
//!
//! - **Urgency ranking**: every open task with a due date gets a score of
//!   `weight / days_left`, or `weight * 100` once it is due or overdue, and
//!   falls into one of four tiers (critical, high, medium, low)
//! - **Subtasks**: any task can be nested under another; listings show the
//!   tree or a flat ranked view, and `tk urgent` surfaces the most urgent
//!   tasks at any depth
//! - **Manual ordering**: `tk reorder` / `tk move` arrange siblings by hand
//! - **Calendar and reminders**: `tk calendar` shows a month of due tasks,
//!   `tk remind` reports what is due today and tomorrow
//!
//! ## Quick Start
//!
//! ```bash
//! tk add "Prepare talk" --due friday --weight 4
//! tk add "Write slides" --parent "Prepare talk"
//! tk list --tree
//! tk urgent
//! ```
//!
//! Data is stored in `~/.taskrank/tasks.json` unless `--db` or `TASKRANK_DB`
//! points elsewhere. Set `RUST_LOG=debug` to see what the store is doing.

use chrono::Local;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub mod calendar;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod hierarchy;
pub mod notify;
pub mod priority;
pub mod reminder;
pub mod service;
pub mod store;
pub mod task;

use cli::Cli;
use cmd::*;
use error::Result;

fn main() {
    // Tracing is opt-in via RUST_LOG; invalid or huge filters are ignored.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let today = Local::now().date_naive();
    // Only commands that touch tasks open the store.
    let open = || open_service(cli.db.clone(), cli.user.clone());

    match cli.command {
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }

        Commands::Add { title, desc, due, weight, parent } =>
            cmd_add(&mut open()?, today, title, desc, due, weight, parent),

        Commands::List { all, due, tree, sort, limit } =>
            cmd_list(&open()?, today, all, due, tree, sort, limit),

        Commands::View { id, children, parents } => cmd_view(&open()?, today, id, children, parents),

        Commands::Update { id, title, desc, due, weight, parent, clear_due, clear_parent } =>
            cmd_update(&mut open()?, today, id, title, desc, due, weight, parent, clear_due, clear_parent),

        Commands::Toggle { id } => cmd_toggle(&mut open()?, id),

        Commands::Delete { id } => cmd_delete(&mut open()?, id),

        Commands::Reorder { ids } => cmd_reorder(&mut open()?, ids),

        Commands::Move { id, index } => cmd_move(&mut open()?, id, index),

        Commands::Urgent { top } => cmd_urgent(&open()?, today, top),

        Commands::Calendar { month } => cmd_calendar(&open()?, today, month),

        Commands::Remind => cmd_remind(&mut open()?, today),
    }
}
