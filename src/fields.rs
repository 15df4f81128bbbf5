//! Enumerations and field types for task management.
//!
//! This module defines the structured value types attached to tasks: the
//! 1–5 importance weight, the urgency tiers derived from a priority score,
//! and the sorting and due-date filters used by the list views.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// User-assigned importance of a task, 1 (lowest) to 5 (highest).
///
/// Serialised as its bare integer so the store keeps the familiar numeric
/// column, but a `Weight` value can never hold anything outside 1..=5.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "i64", into = "i64")]
pub enum Weight {
    One = 1,
    Two = 2,
    #[default]
    Three = 3,
    Four = 4,
    Five = 5,
}

impl Weight {
    pub const ALL: [Weight; 5] = [Weight::One, Weight::Two, Weight::Three, Weight::Four, Weight::Five];

    /// Clamp a loosely typed value from the store into the valid range.
    pub fn clamped(raw: i64) -> Weight {
        match raw {
            i64::MIN..=1 => Weight::One,
            2 => Weight::Two,
            3 => Weight::Three,
            4 => Weight::Four,
            _ => Weight::Five,
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }
}

impl TryFrom<i64> for Weight {
    type Error = Error;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            1..=5 => Ok(Weight::clamped(raw)),
            _ => Err(Error::InvalidWeight(raw)),
        }
    }
}

impl From<Weight> for i64 {
    fn from(w: Weight) -> i64 {
        w.value() as i64
    }
}

impl From<Weight> for f64 {
    fn from(w: Weight) -> f64 {
        w.value() as f64
    }
}

impl FromStr for Weight {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: i64 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidArgument(format!("weight must be a number from 1 to 5, got '{s}'")))?;
        Weight::try_from(raw)
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Discrete urgency tier derived from a priority score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl UrgencyLevel {
    pub const CRITICAL_THRESHOLD: f64 = 5.0;
    pub const HIGH_THRESHOLD: f64 = 3.0;
    pub const MEDIUM_THRESHOLD: f64 = 1.0;

    /// Step function from score to tier. Each tier includes its lower bound.
    pub fn from_score(score: f64) -> UrgencyLevel {
        if score >= Self::CRITICAL_THRESHOLD {
            UrgencyLevel::Critical
        } else if score >= Self::HIGH_THRESHOLD {
            UrgencyLevel::High
        } else if score >= Self::MEDIUM_THRESHOLD {
            UrgencyLevel::Medium
        } else {
            UrgencyLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UrgencyLevel::Critical => "critical",
            UrgencyLevel::High => "high",
            UrgencyLevel::Medium => "medium",
            UrgencyLevel::Low => "low",
        }
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SortKey {
    /// Descending urgency score.
    Priority,
    /// Manual ordering index within each sibling group.
    Order,
    /// Earliest due date first, undated last.
    Due,
}

/// Filtering options for tasks based on due dates.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum DueFilter {
    Today,
    ThisWeek,
    Overdue,
    None,
}
