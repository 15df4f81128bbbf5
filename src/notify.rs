//! Notification seam.
//!
//! The service reports outcomes (task created, load failed, tasks due today)
//! as transient `Notification`s through a `Notifier`. The CLI uses
//! `ConsoleNotifier`, which prints them to stderr.

use std::time::Duration;

use crossterm::style::Stylize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Info,
    Destructive,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: Variant,
    /// How long a graphical front end should keep it on screen.
    pub duration: Option<Duration>,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Notification {
            title: title.into(),
            description: description.into(),
            variant: Variant::Info,
            duration: None,
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Notification {
            title: "Error".into(),
            description: description.into(),
            variant: Variant::Destructive,
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

pub trait Notifier {
    fn notify(&mut self, notification: Notification);
}

/// Prints notifications to stderr, styled by variant.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, n: Notification) {
        let title = match n.variant {
            Variant::Info => n.title.bold().green(),
            Variant::Destructive => n.title.bold().red(),
        };
        if n.description.is_empty() {
            eprintln!("{title}");
        } else {
            eprintln!("{title} {}", n.description);
        }
    }
}
