//! Urgency scoring and priority ordering.
//!
//! A task's score depends only on its weight, due date and completion flag
//! relative to a caller-supplied `today`. Tasks due today or overdue score
//! `weight * 100`, which always outranks any future task (a future score is at
//! most 5), and future tasks score `weight / days_left`.

use chrono::NaiveDate;

use crate::fields::UrgencyLevel;
use crate::hierarchy::flatten;
use crate::task::{Task, TaskNode};

/// Multiplier applied to the weight of tasks due today or overdue.
pub const OVERDUE_MULTIPLIER: f64 = 100.0;

/// Whole calendar days from `today` until `due`; negative when overdue.
pub fn days_left(due: NaiveDate, today: NaiveDate) -> i64 {
    (due - today).num_days()
}

/// Non-negative urgency score of a task.
pub fn calculate_priority(task: &Task, today: NaiveDate) -> f64 {
    let Some(due) = task.due else {
        return 0.0;
    };
    if task.completed {
        return 0.0;
    }
    let weight = f64::from(task.weight);
    match days_left(due, today) {
        d if d <= 0 => weight * OVERDUE_MULTIPLIER,
        d => weight / d as f64,
    }
}

pub fn urgency_level(task: &Task, today: NaiveDate) -> UrgencyLevel {
    UrgencyLevel::from_score(calculate_priority(task, today))
}

/// Order tasks by descending score. The sort is stable: tasks with equal
/// scores keep their input order.
pub fn sort_by_priority<'a, I>(tasks: I, today: NaiveDate) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut scored: Vec<(f64, &Task)> = tasks
        .into_iter()
        .map(|t| (calculate_priority(t, today), t))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, t)| t).collect()
}

/// Stable descending-score sort applied to every sibling group of a forest.
pub fn sort_tree_by_priority(nodes: &mut [TaskNode], today: NaiveDate) {
    nodes.sort_by(|a, b| calculate_priority(&b.task, today).total_cmp(&calculate_priority(&a.task, today)));
    for node in nodes.iter_mut() {
        sort_tree_by_priority(&mut node.subtasks, today);
    }
}

/// The `n` most urgent incomplete tasks anywhere in the forest, so deeply
/// nested subtasks compete with roots.
pub fn top_urgent(roots: &[TaskNode], today: NaiveDate, n: usize) -> Vec<&Task> {
    let incomplete = flatten(roots).into_iter().filter(|t| !t.completed);
    let mut sorted = sort_by_priority(incomplete, today);
    sorted.truncate(n);
    sorted
}
