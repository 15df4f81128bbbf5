//! Runtime configuration.
//!
//! The database path and owner come from CLI flags, which clap fills from
//! `TASKRANK_DB` / `TASKRANK_USER` when absent. Anything still unset falls
//! back to `$HOME/.taskrank/tasks.json` and `$USER`.

use std::path::PathBuf;

use crate::error::{Error, Result};

pub const DB_ENV: &str = "TASKRANK_DB";
pub const USER_ENV: &str = "TASKRANK_USER";

/// Directory under `$HOME` holding the default database.
pub const DATA_DIR: &str = ".taskrank";
pub const DEFAULT_DB_FILE: &str = "tasks.json";
pub const FALLBACK_OWNER: &str = "local";

/// Number of tasks in the "most urgent" summary.
pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub owner: String,
}

impl Config {
    pub fn resolve(db: Option<PathBuf>, user: Option<String>) -> Result<Config> {
        let db_path = match db {
            Some(p) if p.as_os_str().is_empty() => {
                return Err(Error::InvalidArgument("database path cannot be empty".into()));
            }
            Some(p) => p,
            None => default_db_path(),
        };
        let owner = user
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .or_else(|| std::env::var("USER").ok().filter(|u| !u.is_empty()))
            .unwrap_or_else(|| FALLBACK_OWNER.to_string());
        Ok(Config { db_path, owner })
    }
}

pub fn default_db_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(DATA_DIR).join(DEFAULT_DB_FILE)
}
