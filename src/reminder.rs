//! Due-date reminders.
//!
//! Groups the incomplete tasks of a forest that are due today or tomorrow
//! into at most two notifications, each naming the first few tasks.

use std::time::Duration;

use chrono::{Duration as Days, NaiveDate};

use crate::hierarchy::flatten;
use crate::notify::Notification;
use crate::task::{Task, TaskNode};

/// Titles named in a reminder before collapsing into "and N more".
pub const MAX_TITLES: usize = 3;

pub const DUE_TODAY_DISPLAY: Duration = Duration::from_millis(5000);
pub const DUE_TOMORROW_DISPLAY: Duration = Duration::from_millis(4000);

pub fn due_reminders(roots: &[TaskNode], today: NaiveDate) -> Vec<Notification> {
    let pending: Vec<&Task> = flatten(roots)
        .into_iter()
        .filter(|t| !t.completed && t.due.is_some())
        .collect();
    let tomorrow = today + Days::days(1);

    let mut out = Vec::new();
    let due_today: Vec<&Task> = pending.iter().copied().filter(|t| t.due == Some(today)).collect();
    if !due_today.is_empty() {
        out.push(
            Notification::info(format!("{} due today!", count_label(due_today.len())), describe(&due_today))
                .with_duration(DUE_TODAY_DISPLAY),
        );
    }
    let due_tomorrow: Vec<&Task> = pending.iter().copied().filter(|t| t.due == Some(tomorrow)).collect();
    if !due_tomorrow.is_empty() {
        out.push(
            Notification::info(format!("{} due tomorrow", count_label(due_tomorrow.len())), describe(&due_tomorrow))
                .with_duration(DUE_TOMORROW_DISPLAY),
        );
    }
    out
}

fn count_label(n: usize) -> String {
    format!("{n} task{}", if n == 1 { "" } else { "s" })
}

fn describe(tasks: &[&Task]) -> String {
    let names: Vec<&str> = tasks.iter().take(MAX_TITLES).map(|t| t.title.as_str()).collect();
    let mut text = names.join(", ");
    if tasks.len() > MAX_TITLES {
        text.push_str(&format!(" and {} more", tasks.len() - MAX_TITLES));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Weight;
    use crate::hierarchy::build_hierarchy;
    use crate::task::fixtures::{date, due_task};

    #[test]
    fn test_no_reminders_when_nothing_is_due_soon() {
        let today = date(2026, 10, 19);
        let flat = vec![due_task("later", Weight::Two, date(2026, 10, 25))];
        assert!(due_reminders(&build_hierarchy(&flat), today).is_empty());
    }

    #[test]
    fn test_groups_today_and_tomorrow() {
        let today = date(2026, 10, 19);
        let mut flat = vec![
            due_task("a", Weight::Two, today),
            due_task("b", Weight::Two, date(2026, 10, 20)),
            due_task("done", Weight::Two, today),
            due_task("late", Weight::Two, date(2026, 10, 1)),
        ];
        flat[2].completed = true;
        let reminders = due_reminders(&build_hierarchy(&flat), today);
        assert_eq!(reminders.len(), 2);
        assert_eq!(reminders[0].title, "1 task due today!");
        assert_eq!(reminders[0].description, "Task a");
        assert_eq!(reminders[0].duration, Some(DUE_TODAY_DISPLAY));
        assert_eq!(reminders[1].title, "1 task due tomorrow");
        assert_eq!(reminders[1].duration, Some(DUE_TOMORROW_DISPLAY));
    }

    #[test]
    fn test_long_lists_are_collapsed() {
        let today = date(2026, 10, 19);
        let mut flat: Vec<_> = (0..5).map(|i| due_task(&format!("t{i}"), Weight::One, today)).collect();
        // Nested subtasks are included.
        flat[4].parent = Some("t0".into());
        let reminders = due_reminders(&build_hierarchy(&flat), today);
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].title, "5 tasks due today!");
        assert_eq!(reminders[0].description, "Task t0, Task t4, Task t1 and 2 more");
    }
}
