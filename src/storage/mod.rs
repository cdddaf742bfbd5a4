//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Repository metadata upserts
//! - Daily star-count snapshots
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::GhStarsError;
use chrono::NaiveDate;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Storage handle shared by concurrently running segments
pub type SharedStorage = Arc<Mutex<dyn Storage>>;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(GhStarsError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, GhStarsError> {
    SqliteStorage::new(path)
}

/// One star-count observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRow {
    pub repo_id: i64,
    pub snapshot_date: NaiveDate,
    pub star_count: i64,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub target: u64,
    pub fetched: u64,
    pub status: RunStatus,
    pub config_hash: String,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    /// Target reached
    Completed,
    /// Segments ran out before the target
    Partial,
    /// Preflight failed, nothing was crawled
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
