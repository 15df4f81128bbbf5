//! Database operations and utility functions for task management.
//!
//! This module provides the JSON-file `Database`, the `JsonStore` that exposes
//! it through the `TaskStore` interface, and utility functions for due-date
//! parsing, formatting and task lookup.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::hierarchy::{build_children_map, collect_descendants};
use crate::store::{NewTask, TaskPatch, TaskStore};
use crate::task::{Task, TaskRecord};

/// In-memory image of the database file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    pub tasks: Vec<TaskRecord>,
}

impl Database {
    /// Load database from JSON file. A missing file is an empty database.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "database file missing, starting empty");
            return Ok(Database::default());
        }
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        if buf.trim().is_empty() {
            return Ok(Database::default());
        }
        let db: Database = serde_json::from_str(&buf)?;
        debug!(path = %path.display(), tasks = db.tasks.len(), "database loaded");
        Ok(db)
    }

    /// Save database to JSON file using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut TaskRecord> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// IDs of `root` and every task below it.
    pub fn subtree_ids(&self, root: &str) -> HashSet<String> {
        let child_map = build_children_map(
            self.tasks
                .iter()
                .map(|t| (t.id.as_str(), t.parent_task_id.as_deref())),
        );
        let mut found = HashSet::new();
        collect_descendants(root, &child_map, &mut found);
        let mut ids: HashSet<String> = found.into_iter().map(str::to_string).collect();
        ids.insert(root.to_string());
        ids
    }

    pub fn remove_ids(&mut self, ids: &HashSet<String>) {
        self.tasks.retain(|t| !ids.contains(&t.id));
    }
}

/// `TaskStore` backed by a JSON file, written through on every mutation.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    db: Database,
}

impl JsonStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let db = Database::load(&path)?;
        Ok(JsonStore { path, db })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        self.db.save(&self.path)
    }
}

impl TaskStore for JsonStore {
    fn create(&mut self, new: NewTask) -> Result<TaskRecord> {
        let now_utc = Utc::now().timestamp();
        let record = TaskRecord {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            title: new.title,
            description: new.description,
            due_date: new.due_date,
            weight: new.weight,
            parent_task_id: new.parent_task_id,
            completed: false,
            order_position: new.order_position,
            created_at_utc: now_utc,
            updated_at_utc: now_utc,
        };
        self.db.tasks.push(record.clone());
        self.persist()?;
        info!(task = %record.id, "task created");
        Ok(record)
    }

    fn update(&mut self, id: &str, patch: TaskPatch) -> Result<TaskRecord> {
        let record = self
            .db
            .get_mut(id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        patch.apply(record);
        record.updated_at_utc = Utc::now().timestamp();
        let updated = record.clone();
        self.persist()?;
        debug!(task = %id, "task updated");
        Ok(updated)
    }

    fn delete(&mut self, id: &str) -> Result<Vec<String>> {
        if self.db.get(id).is_none() {
            return Err(Error::TaskNotFound(id.to_string()));
        }
        let ids = self.db.subtree_ids(id);
        let removed: Vec<String> = self
            .db
            .tasks
            .iter()
            .filter(|t| ids.contains(&t.id))
            .map(|t| t.id.clone())
            .collect();
        self.db.remove_ids(&ids);
        self.persist()?;
        info!(task = %id, removed = removed.len(), "task deleted with subtree");
        Ok(removed)
    }

    fn list_by_owner(&self, owner: &str) -> Result<Vec<TaskRecord>> {
        let mut records: Vec<TaskRecord> = self
            .db
            .tasks
            .iter()
            .filter(|t| t.user_id == owner)
            .cloned()
            .collect();
        records.sort_by_key(|t| t.order_position);
        Ok(records)
    }

    fn update_order(&mut self, id: &str, position: i64) -> Result<()> {
        let record = self
            .db
            .get_mut(id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        record.order_position = position;
        record.updated_at_utc = Utc::now().timestamp();
        self.persist()
    }
}

/// Parse human-readable due date input relative to `today`.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "monday", "next friday", "this sat", ...
/// - "end of week", "end of month"
/// - "in 3d", "in 2w", "in 1m"
/// - "YYYY-MM-DD" format
pub fn parse_due_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        "end of week" | "eow" => {
            let (_, end) = start_end_of_this_week(today);
            return Some(end);
        }
        "end of month" | "eom" => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            let first_of_next = NaiveDate::from_ymd_opt(year, month, 1)?;
            return Some(first_of_next - Duration::days(1));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        if let Some((idx, _)) = rest.char_indices().last() {
            let (num, unit) = rest.split_at(idx);
            if let Ok(n) = num.trim().parse::<i64>() {
                // Out-of-range offsets are rejected rather than wrapped.
                let offset = match unit {
                    "d" => Duration::try_days(n),
                    "w" => Duration::try_weeks(n),
                    // Approximate: 30 days per month
                    "m" => n.checked_mul(30).and_then(Duration::try_days),
                    _ => None,
                };
                if let Some(offset) = offset {
                    return today.checked_add_signed(offset);
                }
                if matches!(unit, "d" | "w" | "m") {
                    return None;
                }
            }
        }
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
        ("mon", 0), ("tue", 1), ("wed", 2), ("thu", 3),
        ("fri", 4), ("sat", 5), ("sun", 6),
    ];
    let current_day = today.weekday().num_days_from_monday() as i64;
    for (day_name, target_day) in weekdays {
        let days_ahead = (target_day + 7 - current_day) % 7;
        if s == day_name || s == format!("this {day_name}") {
            return Some(today + Duration::days(days_ahead));
        }
        if s == format!("next {day_name}") {
            let days_to_add = if days_ahead == 0 { 7 } else { days_ahead + 7 };
            return Some(today + Duration::days(days_to_add));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Calculate the start and end dates of the current ISO week (Monday to Sunday).
pub fn start_end_of_this_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = today.weekday().num_days_from_monday() as i64;
    let start = today - Duration::days(weekday);
    let end = start + Duration::days(6);
    (start, end)
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: Option<NaiveDate>, today: NaiveDate) -> String {
    match due {
        None => "-".into(),
        Some(d) => match (d - today).num_days() {
            0 => "today".into(),
            1 => "tomorrow".into(),
            n if n > 1 => format!("in {n}d"),
            n => format!("{}d late", -n),
        },
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Resolve a task identifier to a task ID.
///
/// Accepts a full ID, a unique ID prefix, or a case-insensitive exact title.
/// Ambiguous prefixes or titles are an error listing the candidates.
pub fn resolve_task_identifier(identifier: &str, tasks: &[Task]) -> Result<String> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(Error::InvalidArgument("task identifier cannot be empty".into()));
    }
    if let Some(t) = tasks.iter().find(|t| t.id == identifier) {
        return Ok(t.id.clone());
    }

    let by_prefix: Vec<&Task> = tasks.iter().filter(|t| t.id.starts_with(identifier)).collect();
    let matches = if by_prefix.is_empty() {
        let wanted = identifier.to_lowercase();
        tasks
            .iter()
            .filter(|t| t.title.to_lowercase() == wanted)
            .collect()
    } else {
        by_prefix
    };

    match matches.as_slice() {
        [] => Err(Error::TaskNotFound(identifier.to_string())),
        [one] => Ok(one.id.clone()),
        many => Err(Error::AmbiguousTask {
            identifier: identifier.to_string(),
            matches: many
                .iter()
                .map(|t| format!("  {}: {}", short_id(&t.id), t.title))
                .collect::<Vec<_>>()
                .join("\n"),
        }),
    }
}

/// First eight characters of an ID, enough to address it from the CLI.
pub fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(i, _)| &id[..i])
}
