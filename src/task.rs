//! Task data structures.
//!
//! `TaskRecord` is the loosely typed row the store persists, `Task` is the
//! validated flat value the core works with, and `TaskNode` is a task together
//! with its owned subtasks in the tree representation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fields::Weight;

/// A single work item, flat: children are expressed only through `parent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub description: String,
    pub due: Option<NaiveDate>,
    pub weight: Weight,
    pub completed: bool,
    pub parent: Option<String>,
    /// Manual ordering index within the task's sibling group.
    pub order: i64,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

/// A task in the tree representation, owning its ordered subtasks.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskNode {
    pub task: Task,
    pub subtasks: Vec<TaskNode>,
}

impl TaskNode {
    pub fn new(task: Task) -> Self {
        TaskNode { task, subtasks: Vec::new() }
    }

    pub fn id(&self) -> &str {
        &self.task.id
    }

    /// Number of tasks in this subtree, including this one.
    pub fn size(&self) -> usize {
        1 + self.subtasks.iter().map(TaskNode::size).sum::<usize>()
    }
}

/// Persisted shape of a task, as stored by a `TaskStore`.
///
/// Fields mirror the hosted table layout: weight is an unconstrained integer
/// and description is nullable, so conversion into `Task` normalises both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub weight: i64,
    #[serde(default)]
    pub parent_task_id: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub order_position: i64,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

impl From<TaskRecord> for Task {
    fn from(r: TaskRecord) -> Self {
        Task {
            id: r.id,
            owner: r.user_id,
            title: r.title,
            description: r.description.unwrap_or_default(),
            due: r.due_date,
            weight: Weight::clamped(r.weight),
            completed: r.completed,
            parent: r.parent_task_id.filter(|p| !p.is_empty()),
            order: r.order_position,
            created_at_utc: r.created_at_utc,
            updated_at_utc: r.updated_at_utc,
        }
    }
}

/// User input for creating or editing a task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub due: Option<NaiveDate>,
    /// Left unset, a subtask inherits its parent's weight; a root task gets
    /// the default weight.
    pub weight: Option<Weight>,
}

impl TaskForm {
    pub fn titled(title: impl Into<String>) -> Self {
        TaskForm { title: title.into(), ..Default::default() }
    }

    /// Trimmed title, rejecting blank input.
    pub fn validated_title(&self) -> Result<String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Error::EmptyTitle);
        }
        Ok(title.to_string())
    }

    /// Description trimmed, mapped to `None` when blank for storage.
    pub fn stored_description(&self) -> Option<String> {
        let d = self.description.trim();
        (!d.is_empty()).then(|| d.to_string())
    }
}
