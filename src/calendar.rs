//! Monthly calendar queries.
//!
//! The calendar view shows, for each day of a month, the incomplete tasks due
//! that day. Weeks start on Sunday.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::hierarchy::flatten;
use crate::task::{Task, TaskNode};

/// Tasks shown per day cell before "+N more".
pub const MAX_TASKS_PER_DAY: usize = 3;

/// Every date of the given month, or empty for an invalid month.
pub fn month_days(year: i32, month: u32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|d| d.month() == month)
        .collect()
}

/// Blank cells before the first day in a Sunday-first week grid.
pub fn leading_blanks(year: i32, month: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map_or(0, |d| d.weekday().num_days_from_sunday())
}

/// Move `(year, month)` by `delta` months, or `None` if the year leaves `i32`.
pub fn shift_month(year: i32, month: u32, delta: i32) -> Option<(i32, u32)> {
    let index = i64::from(year) * 12 + i64::from(month) - 1 + i64::from(delta);
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    Some((year, index.rem_euclid(12) as u32 + 1))
}

/// Incomplete tasks anywhere in the forest that are due on `date`.
pub fn tasks_for_date(roots: &[TaskNode], date: NaiveDate) -> Vec<&Task> {
    flatten(roots)
        .into_iter()
        .filter(|t| !t.completed && t.due == Some(date))
        .collect()
}

/// Incomplete tasks due within the month, grouped by due date.
pub fn month_agenda(roots: &[TaskNode], year: i32, month: u32) -> BTreeMap<NaiveDate, Vec<&Task>> {
    let mut agenda: BTreeMap<NaiveDate, Vec<&Task>> = BTreeMap::new();
    for t in flatten(roots) {
        if t.completed {
            continue;
        }
        if let Some(d) = t.due.filter(|d| d.year() == year && d.month() == month) {
            agenda.entry(d).or_default().push(t);
        }
    }
    agenda
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Weight;
    use crate::hierarchy::build_hierarchy;
    use crate::task::fixtures::{date, due_task};

    #[test]
    fn test_month_days() {
        assert_eq!(month_days(2026, 10).len(), 31);
        assert_eq!(month_days(2028, 2).len(), 29);
        assert_eq!(month_days(2026, 2).last(), Some(&date(2026, 2, 28)));
        assert!(month_days(2026, 13).is_empty());
    }

    #[test]
    fn test_leading_blanks_start_on_sunday() {
        // 2026-10-01 is a Thursday, 2026-11-01 a Sunday.
        assert_eq!(leading_blanks(2026, 10), 4);
        assert_eq!(leading_blanks(2026, 11), 0);
    }

    #[test]
    fn test_shift_month_wraps_years() {
        assert_eq!(shift_month(2026, 12, 1), Some((2027, 1)));
        assert_eq!(shift_month(2026, 1, -1), Some((2025, 12)));
        assert_eq!(shift_month(2026, 5, -17), Some((2024, 12)));
        assert_eq!(shift_month(2026, 5, 0), Some((2026, 5)));
    }

    #[test]
    fn test_shift_month_out_of_range() {
        assert_eq!(shift_month(2026, 10, i32::MAX), None);
        assert_eq!(shift_month(i32::MIN, 1, -1), None);
        assert!(shift_month(2026, 10, i32::MIN).is_some());
    }

    #[test]
    fn test_tasks_for_date_and_agenda() {
        let mut flat = vec![
            due_task("a", Weight::One, date(2026, 10, 5)),
            due_task("b", Weight::One, date(2026, 10, 5)),
            due_task("c", Weight::One, date(2026, 10, 9)),
            due_task("next", Weight::One, date(2026, 11, 5)),
            due_task("done", Weight::One, date(2026, 10, 5)),
        ];
        flat[1].parent = Some("a".into());
        flat[4].completed = true;
        let roots = build_hierarchy(&flat);

        let on_fifth: Vec<&str> = tasks_for_date(&roots, date(2026, 10, 5)).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(on_fifth, vec!["a", "b"]);

        let agenda = month_agenda(&roots, 2026, 10);
        assert_eq!(agenda.len(), 2);
        assert_eq!(agenda[&date(2026, 10, 5)].len(), 2);
        assert_eq!(agenda[&date(2026, 10, 9)][0].id, "c");
    }
}
