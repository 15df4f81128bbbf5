//! Command implementations for the CLI interface.
//!
//! This module contains the subcommand definitions and their handlers. Every
//! handler works through the `TaskService` and returns the error to `main`,
//! which prints it and picks the exit code.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};
use crossterm::style::{StyledContent, Stylize};

use crate::calendar::{leading_blanks, month_agenda, month_days, shift_month, tasks_for_date, MAX_TASKS_PER_DAY};
use crate::cli::Cli;
use crate::config::{Config, DEFAULT_TOP_N};
use crate::db::*;
use crate::error::{Error, Result};
use crate::fields::*;
use crate::hierarchy::{collect_ancestors, depth_map};
use crate::notify::ConsoleNotifier;
use crate::priority::{calculate_priority, sort_by_priority, sort_tree_by_priority, urgency_level};
use crate::service::TaskService;
use crate::task::{Task, TaskForm, TaskNode};

pub type Service = TaskService<JsonStore, ConsoleNotifier>;

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", "friday", or "in Nd".
        #[arg(long)]
        due: Option<String>,
        /// Importance from 1 (lowest) to 5 (highest).
        #[arg(long, short)]
        weight: Option<Weight>,
        /// Parent task ID, ID prefix or title.
        #[arg(long)]
        parent: Option<String>,
    },

    /// List tasks with optional filters.
    List {
        /// Include completed tasks.
        #[arg(long)]
        all: bool,
        /// Due filter: today | this-week | overdue | none.
        #[arg(long, value_enum)]
        due: Option<DueFilter>,
        /// Render as a tree across parent-child relationships.
        #[arg(long)]
        tree: bool,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::Priority)]
        sort: SortKey,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// View a single task.
    View {
        /// Task ID, ID prefix or title.
        id: String,
        /// Show child subtree.
        #[arg(long)]
        children: bool,
        /// Show ancestor chain.
        #[arg(long)]
        parents: bool,
    },

    /// Update fields on a task.
    Update {
        /// Task ID, ID prefix or title.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long, short)]
        weight: Option<Weight>,
        /// New parent task ID, ID prefix or title.
        #[arg(long, conflicts_with = "clear_parent")]
        parent: Option<String>,
        /// Clear due date.
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
        /// Move the task to the top level.
        #[arg(long)]
        clear_parent: bool,
    },

    /// Toggle a task between open and done.
    Toggle {
        /// Task ID, ID prefix or title.
        id: String,
    },

    /// Delete a task together with all of its subtasks.
    Delete {
        /// Task ID, ID prefix or title.
        id: String,
    },

    /// Set the manual order of sibling tasks.
    Reorder {
        /// Sibling tasks in their new order.
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Move a task to a position among its siblings.
    Move {
        /// Task ID, ID prefix or title.
        id: String,
        /// Zero-based target position.
        index: usize,
    },

    /// Show the most urgent open tasks, subtasks included.
    Urgent {
        /// How many tasks to show.
        #[arg(long, short = 'n', default_value_t = DEFAULT_TOP_N)]
        top: usize,
    },

    /// Show a month of due tasks.
    Calendar {
        /// Month as YYYY-MM, or +N/-N months from now. Defaults to the current month.
        #[arg(long, allow_hyphen_values = true)]
        month: Option<String>,
    },

    /// Show reminders for tasks due today and tomorrow.
    Remind,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Resolve configuration, open the JSON store and load the owner's tasks.
pub fn open_service(db: Option<PathBuf>, user: Option<String>) -> Result<Service> {
    let config = Config::resolve(db, user)?;
    let store = JsonStore::open(&config.db_path)?;
    tracing::debug!(db = %store.path().display(), owner = %config.owner, "store opened");
    TaskService::load(store, ConsoleNotifier, config.owner)
}

/// Add a new task.
pub fn cmd_add(
    svc: &mut Service,
    today: NaiveDate,
    title: String,
    desc: Option<String>,
    due: Option<String>,
    weight: Option<Weight>,
    parent: Option<String>,
) -> Result<()> {
    let parent_id = parent.map(|p| svc.resolve(&p)).transpose()?;
    let form = TaskForm {
        title,
        description: desc.unwrap_or_default(),
        due: due.as_deref().map(|d| parse_due(d, today)).transpose()?,
        weight,
    };
    let task = svc.create(form, parent_id.as_deref())?;
    println!("Added task {}", short_id(&task.id));
    Ok(())
}

/// List tasks with optional filtering and sorting.
pub fn cmd_list(
    svc: &Service,
    today: NaiveDate,
    all: bool,
    due: Option<DueFilter>,
    tree: bool,
    sort: SortKey,
    limit: Option<usize>,
) -> Result<()> {
    let keep = |t: &Task| (all || !t.completed) && matches_due(t, due, today);

    if tree {
        let mut roots: Vec<TaskNode> = svc.tasks().to_vec();
        match sort {
            SortKey::Priority => sort_tree_by_priority(&mut roots, today),
            SortKey::Due => sort_tree_by_due(&mut roots),
            SortKey::Order => {}
        }
        let depths = depth_map(&roots);
        let mut rows = Vec::new();
        tree_rows(&roots, &keep, &mut rows);
        if let Some(n) = limit {
            rows.truncate(n);
        }
        print_table(&rows, Some(&depths), today);
        return Ok(());
    }

    let filtered = svc.flattened().into_iter().filter(|&t| keep(t));
    let mut rows: Vec<&Task> = match sort {
        SortKey::Priority => sort_by_priority(filtered, today),
        SortKey::Order => filtered.collect(),
        SortKey::Due => {
            let mut v: Vec<&Task> = filtered.collect();
            v.sort_by_key(|t| t.due.unwrap_or(NaiveDate::MAX));
            v
        }
    };
    if let Some(n) = limit {
        rows.truncate(n);
    }
    print_table(&rows, None, today);
    Ok(())
}

/// View detailed information about a specific task.
pub fn cmd_view(svc: &Service, today: NaiveDate, id: String, children: bool, parents: bool) -> Result<()> {
    let task_id = svc.resolve(&id)?;
    let node = svc
        .find_node(&task_id)
        .ok_or_else(|| Error::TaskNotFound(task_id.clone()))?;
    let task = &node.task;
    let score = calculate_priority(task, today);

    println!("ID:           {}", task.id);
    println!("Title:        {}", task.title);
    println!("Status:       {}", if task.completed { "Done" } else { "Open" });
    println!("Weight:       {}", task.weight);
    println!("Due:          {}", match task.due {
        Some(d) => format!("{d} ({})", format_due_relative(Some(d), today)),
        None => "-".into(),
    });
    println!("Priority:     {score:.2} ({})", urgency_level(task, today));
    println!("Parent:       {}", task.parent.as_deref().map(short_id).unwrap_or("-"));
    println!("Order:        {}", task.order);
    println!("Created UTC:  {}", format_timestamp(task.created_at_utc));
    println!("Updated UTC:  {}", format_timestamp(task.updated_at_utc));
    println!("Description:\n{}\n", if task.description.is_empty() { "-" } else { task.description.as_str() });

    if parents {
        let chain = collect_ancestors(&task_id, svc.flat());
        if chain.is_empty() {
            println!("Ancestors: -");
        } else {
            let names: Vec<String> = chain
                .iter()
                .map(|a| match svc.find(a) {
                    Some(t) => format!("{} (#{})", t.title, short_id(a)),
                    None => short_id(a).to_string(),
                })
                .collect();
            println!("Ancestors (closest first): {}", names.join(" -> "));
        }
    }

    if children {
        println!("Children ({} below):", node.size() - 1);
        if node.subtasks.is_empty() {
            println!("  -");
        } else {
            fn dfs(nodes: &[TaskNode], depth: usize) {
                for n in nodes {
                    let mark = if n.task.completed { "x" } else { " " };
                    println!("{}- [{mark}] {} (#{})", "  ".repeat(depth), n.task.title, short_id(n.id()));
                    dfs(&n.subtasks, depth + 1);
                }
            }
            dfs(&node.subtasks, 1);
        }
    }
    Ok(())
}

/// Update an existing task's fields.
pub fn cmd_update(
    svc: &mut Service,
    today: NaiveDate,
    id: String,
    title: Option<String>,
    desc: Option<String>,
    due: Option<String>,
    weight: Option<Weight>,
    parent: Option<String>,
    clear_due: bool,
    clear_parent: bool,
) -> Result<()> {
    let task_id = svc.resolve(&id)?;
    let current = svc
        .find(&task_id)
        .cloned()
        .ok_or_else(|| Error::TaskNotFound(task_id.clone()))?;
    let parent_id = parent.map(|p| svc.resolve(&p)).transpose()?;

    let edits_fields = title.is_some() || desc.is_some() || due.is_some() || weight.is_some() || clear_due;
    if edits_fields {
        let due = match due {
            Some(d) => Some(parse_due(&d, today)?),
            None if clear_due => None,
            None => current.due,
        };
        let form = TaskForm {
            title: title.unwrap_or_else(|| current.title.clone()),
            description: desc.unwrap_or_else(|| current.description.clone()),
            due,
            weight: weight.or(Some(current.weight)),
        };
        svc.update(&task_id, form)?;
    }

    if let Some(pid) = parent_id {
        svc.set_parent(&task_id, Some(&pid))?;
    } else if clear_parent {
        svc.set_parent(&task_id, None)?;
    }

    println!("Updated task {}", short_id(&task_id));
    Ok(())
}

/// Toggle completion of a task.
pub fn cmd_toggle(svc: &mut Service, id: String) -> Result<()> {
    let task_id = svc.resolve(&id)?;
    let done = svc.toggle_complete(&task_id)?;
    if done {
        println!("Marked {} done.", short_id(&task_id));
    } else {
        println!("Reopened {}", short_id(&task_id));
    }
    Ok(())
}

/// Delete a task and every task below it.
pub fn cmd_delete(svc: &mut Service, id: String) -> Result<()> {
    let task_id = svc.resolve(&id)?;
    let removed = svc.delete(&task_id)?;
    println!("Deleted {} task(s).", removed.len());
    Ok(())
}

pub fn cmd_reorder(svc: &mut Service, ids: Vec<String>) -> Result<()> {
    let resolved = ids
        .iter()
        .map(|i| svc.resolve(i))
        .collect::<Result<Vec<_>>>()?;
    svc.reorder(&resolved)?;
    println!("Reordered {} task(s).", resolved.len());
    Ok(())
}

pub fn cmd_move(svc: &mut Service, id: String, index: usize) -> Result<()> {
    let task_id = svc.resolve(&id)?;
    svc.move_to(&task_id, index)?;
    println!("Moved {} to position {index}.", short_id(&task_id));
    Ok(())
}

/// Print the most urgent open tasks.
pub fn cmd_urgent(svc: &Service, today: NaiveDate, top: usize) -> Result<()> {
    let urgent = svc.urgent(today, top);
    if urgent.is_empty() {
        println!("{}", "All caught up! No urgent tasks.".green());
        return Ok(());
    }
    println!("Top {} urgent tasks", urgent.len());
    for (i, t) in urgent.iter().enumerate() {
        let due = t.due.map(|d| d.format("%b %d").to_string()).unwrap_or_else(|| "-".into());
        let line = format!(
            "#{:<2} {:<40} due {:<7} weight {}",
            i + 1,
            truncate(&t.title, 40),
            due,
            t.weight
        );
        println!("{}", paint(line, urgency_level(t, today)));
    }
    Ok(())
}

/// Print a Sunday-first month grid followed by the month's agenda.
pub fn cmd_calendar(svc: &Service, today: NaiveDate, month: Option<String>) -> Result<()> {
    let (year, month) = match month {
        Some(m) => parse_month(&m, today)?,
        None => (today.year(), today.month()),
    };
    let agenda = month_agenda(svc.tasks(), year, month);
    let days = month_days(year, month);
    let Some(first) = days.first() else {
        return Err(Error::InvalidArgument(format!("invalid month {year}-{month:02}")));
    };

    println!("{:^28}", first.format("%B %Y").to_string());
    println!(" Sun Mon Tue Wed Thu Fri Sat");
    let mut line = "    ".repeat(leading_blanks(year, month) as usize);
    for d in &days {
        let cell = format!("{:>3}{}", d.day(), if agenda.contains_key(d) { "*" } else { " " });
        let cell = match agenda.get(d) {
            Some(tasks) => {
                let level = tasks.iter().map(|t| urgency_level(t, today)).max().unwrap_or(UrgencyLevel::Low);
                paint(cell, level).to_string()
            }
            None if *d == today => cell.reverse().to_string(),
            None => cell,
        };
        line.push_str(&cell);
        if d.weekday().num_days_from_sunday() == 6 {
            println!("{line}");
            line.clear();
        }
    }
    if !line.is_empty() {
        println!("{line}");
    }

    if agenda.is_empty() {
        println!("\nNo tasks due this month.");
        return Ok(());
    }
    if (year, month) == (today.year(), today.month()) {
        let due_today = tasks_for_date(svc.tasks(), today).len();
        println!("\n{due_today} open task(s) due today.");
    }
    println!();
    for (date, tasks) in &agenda {
        let shown: Vec<String> = tasks
            .iter()
            .take(MAX_TASKS_PER_DAY)
            .map(|t| paint(truncate(&t.title, 24), urgency_level(t, today)).to_string())
            .collect();
        let more = tasks.len().saturating_sub(MAX_TASKS_PER_DAY);
        let more = if more > 0 { format!(" +{more} more") } else { String::new() };
        println!("{}  {}{}", date.format("%a %d"), shown.join(", "), more);
    }
    Ok(())
}

pub fn cmd_remind(svc: &mut Service, today: NaiveDate) -> Result<()> {
    if svc.remind(today) == 0 {
        println!("Nothing due today or tomorrow.");
    }
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

/// Print tasks in a formatted table with optional tree indentation.
pub fn print_table(tasks: &[&Task], depths: Option<&HashMap<&str, usize>>, today: NaiveDate) {
    println!(
        "{:<9} {:<4} {:<9} {:<9} {}",
        "ID", "Wt", "Urgency", "Due", "Title"
    );
    for t in tasks {
        let indent = depths.and_then(|m| m.get(t.id.as_str()).copied()).unwrap_or(0);
        let mark = if t.completed { "[x] " } else { "" };
        let row = format!(
            "{:<9} {:<4} {:<9} {:<9} {}{}{}",
            short_id(&t.id),
            t.weight,
            urgency_level(t, today),
            format_due_relative(t.due, today),
            "  ".repeat(indent),
            mark,
            t.title
        );
        if t.completed {
            println!("{}", row.dark_grey());
        } else {
            println!("{}", paint(row, urgency_level(t, today)));
        }
    }
}

fn paint(text: String, level: UrgencyLevel) -> StyledContent<String> {
    match level {
        UrgencyLevel::Critical => text.red().bold(),
        UrgencyLevel::High => text.dark_yellow(),
        UrgencyLevel::Medium => text.yellow(),
        UrgencyLevel::Low => text.green(),
    }
}

/// Pre-order rows of every node that matches `keep` or has a matching
/// descendant, so indented rows always sit under their real parent.
fn tree_rows<'a>(nodes: &'a [TaskNode], keep: &dyn Fn(&Task) -> bool, out: &mut Vec<&'a Task>) -> bool {
    let mut any = false;
    for node in nodes {
        let at = out.len();
        out.push(&node.task);
        let below = tree_rows(&node.subtasks, keep, out);
        if keep(&node.task) || below {
            any = true;
        } else {
            out.truncate(at);
        }
    }
    any
}

fn sort_tree_by_due(nodes: &mut [TaskNode]) {
    nodes.sort_by_key(|n| n.task.due.unwrap_or(NaiveDate::MAX));
    for n in nodes.iter_mut() {
        sort_tree_by_due(&mut n.subtasks);
    }
}

fn matches_due(t: &Task, filter: Option<DueFilter>, today: NaiveDate) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    let (week_start, week_end) = start_end_of_this_week(today);
    match (filter, t.due) {
        (DueFilter::None, due) => due.is_none(),
        (_, None) => false,
        (DueFilter::Today, Some(d)) => d == today,
        (DueFilter::ThisWeek, Some(d)) => d >= week_start && d <= week_end,
        (DueFilter::Overdue, Some(d)) => d < today,
    }
}

fn parse_due(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    parse_due_input(input, today)
        .ok_or_else(|| Error::InvalidArgument(format!("could not understand due date '{input}'")))
}

/// `YYYY-MM`, or a signed offset from the current month such as `+1` / `-2`.
fn parse_month(input: &str, today: NaiveDate) -> Result<(i32, u32)> {
    let input = input.trim();
    let invalid = || Error::InvalidArgument(format!("month must look like YYYY-MM or +N/-N, got '{input}'"));
    if input.starts_with('+') || input.starts_with('-') {
        let delta: i32 = input.parse().map_err(|_| invalid())?;
        return shift_month(today.year(), today.month(), delta).ok_or_else(invalid);
    }
    let (y, m) = input.split_once('-').ok_or_else(invalid)?;
    let year: i32 = y.parse().map_err(|_| invalid())?;
    let month: u32 = m.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

fn format_timestamp(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}
