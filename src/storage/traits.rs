//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{RunRecord, RunStatus, SnapshotRow};
use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Storage task failed: {0}")]
    Task(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The crawler only writes through `upsert_repository` and
/// `bulk_insert_snapshots`; the rest serves run bookkeeping and statistics.
pub trait Storage: Send {
    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state
    ///
    /// # Arguments
    ///
    /// * `target` - Repositories the run intends to fetch
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, target: u64, config_hash: &str) -> StorageResult<i64>;

    /// Records the final status and fetched count of a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus, fetched: u64) -> StorageResult<()>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Repositories and Snapshots =====

    /// Inserts a repository or refreshes its name, language and update time
    ///
    /// Idempotent per `id`; the last write wins.
    fn upsert_repository(
        &mut self,
        id: i64,
        name_owner: &str,
        language: Option<&str>,
    ) -> StorageResult<()>;

    /// Inserts snapshot rows, silently keeping any existing row for the same
    /// (repository, date)
    ///
    /// # Returns
    ///
    /// The number of rows actually inserted
    fn bulk_insert_snapshots(&mut self, rows: &[SnapshotRow]) -> StorageResult<usize>;

    /// Gets the star count recorded for a repository on a date
    fn get_snapshot(&self, repo_id: i64, date: NaiveDate) -> StorageResult<Option<i64>>;

    // ===== Statistics =====

    /// Gets total repository count
    fn count_repositories(&self) -> StorageResult<u64>;

    /// Gets total snapshot count
    fn count_snapshots(&self) -> StorageResult<u64>;

    /// Counts snapshots taken on one date
    fn count_snapshots_on(&self, date: NaiveDate) -> StorageResult<u64>;
}
