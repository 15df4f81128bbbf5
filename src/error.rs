//! Error types for taskrank.
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad arguments, unknown task, invalid hierarchy change)
//! - 4: Operation failed (database I/O or decoding)

use thiserror::Error;

/// Exit codes for the `tk` CLI
pub mod exit_codes {
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskrank operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Multiple tasks match '{identifier}':\n{matches}\nPlease use the task ID instead.")]
    AmbiguousTask { identifier: String, matches: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task title cannot be empty")]
    EmptyTitle,

    #[error("Weight must be between 1 and 5, got {0}")]
    InvalidWeight(i64),

    #[error("Moving {task} under {parent} would make it its own ancestor")]
    CycleDetected { task: String, parent: String },

    #[error("Reordered tasks must share the same parent")]
    NotSiblings,

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::TaskNotFound(_)
            | Error::AmbiguousTask { .. }
            | Error::InvalidArgument(_)
            | Error::EmptyTitle
            | Error::InvalidWeight(_)
            | Error::CycleDetected { .. }
            | Error::NotSiblings => exit_codes::USER_ERROR,

            Error::Io(_) | Error::Json(_) => exit_codes::OPERATION_FAILED,
        }
    }
}

/// Result type alias for taskrank operations
pub type Result<T> = std::result::Result<T, Error>;
