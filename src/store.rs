//! Persistence seam.
//!
//! The task service talks to durable storage only through `TaskStore`, a
//! plain CRUD interface over `TaskRecord`s. `crate::db::JsonStore` is the
//! file-backed implementation used by the CLI.

use chrono::NaiveDate;

use crate::error::Result;
use crate::task::TaskRecord;

/// Fields supplied when inserting a task; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub weight: i64,
    pub parent_task_id: Option<String>,
    pub order_position: i64,
}

/// Partial update: `None` leaves a field untouched. Nullable columns use a
/// nested option so they can be cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub weight: Option<i64>,
    pub completed: Option<bool>,
    pub parent_task_id: Option<Option<String>>,
    pub order_position: Option<i64>,
}

impl TaskPatch {
    pub fn completed(done: bool) -> Self {
        TaskPatch { completed: Some(done), ..Default::default() }
    }

    pub fn apply(self, record: &mut TaskRecord) {
        if let Some(v) = self.title {
            record.title = v;
        }
        if let Some(v) = self.description {
            record.description = v;
        }
        if let Some(v) = self.due_date {
            record.due_date = v;
        }
        if let Some(v) = self.weight {
            record.weight = v;
        }
        if let Some(v) = self.completed {
            record.completed = v;
        }
        if let Some(v) = self.parent_task_id {
            record.parent_task_id = v;
        }
        if let Some(v) = self.order_position {
            record.order_position = v;
        }
    }
}

/// CRUD operations on task records.
pub trait TaskStore {
    /// Insert a task, returning the stored record.
    fn create(&mut self, new: NewTask) -> Result<TaskRecord>;

    /// Apply a patch and bump `updated_at_utc`.
    fn update(&mut self, id: &str, patch: TaskPatch) -> Result<TaskRecord>;

    /// Remove a task together with its entire subtree. Returns removed IDs.
    fn delete(&mut self, id: &str) -> Result<Vec<String>>;

    /// Records owned by `owner`, in ascending `order_position` (stable).
    fn list_by_owner(&self, owner: &str) -> Result<Vec<TaskRecord>>;

    fn update_order(&mut self, id: &str, position: i64) -> Result<()>;
}
