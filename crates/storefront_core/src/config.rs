//! Store configuration.
//!
//! # Responsibility
//! - Describe where the store lives and how the process logs.
//! - Open a ready-to-use connection from that description.
//!
//! # Invariants
//! - The default configuration opens an in-memory store and does not log to
//!   files.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::{default_log_level, init_logging, LogLevel, LoggingError};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Location of the backing SQLite store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseLocation {
    /// Private in-memory database, discarded with the connection.
    #[default]
    Memory,
    File(PathBuf),
}

/// Top-level configuration for processes embedding the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database: DatabaseLocation,
    pub log_level: LogLevel,
    /// Absolute directory for rolling log files; `None` leaves logging off.
    pub log_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: DatabaseLocation::Memory,
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl StoreConfig {
    /// Opens the configured store with migrations applied.
    pub fn open(&self) -> DbResult<Connection> {
        match &self.database {
            DatabaseLocation::Memory => open_db_in_memory(),
            DatabaseLocation::File(path) => open_db(path),
        }
    }

    /// Starts file logging when `log_dir` is set; no-op otherwise.
    pub fn init_logging(&self) -> Result<(), LoggingError> {
        match &self.log_dir {
            Some(dir) => init_logging(self.log_level, dir),
            None => Ok(()),
        }
    }
}
