//! Configuration loading and management
//!
//! The configuration lives in `~/.studysync/config.toml` and is created with
//! defaults on first use.

mod io;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Identity used for all study data on this machine
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// SQLite database file; defaults to `~/.studysync/studysync.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Log level used when neither `RUST_LOG` nor `--verbose` is set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Print badge unlock notifications
    #[serde(default = "default_true")]
    pub notifications: bool,
}

fn default_user_id() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            database_path: None,
            log_level: default_log_level(),
            notifications: true,
        }
    }
}

impl Config {
    /// Resolved database location
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| Self::global_config_dir().join("studysync.db"))
    }
}
