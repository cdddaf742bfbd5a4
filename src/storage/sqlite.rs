//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, SnapshotRow};
use crate::GhStarsError;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(GhStarsError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, GhStarsError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, GhStarsError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        target: row.get::<_, i64>(3)? as u64,
        fetched: row.get::<_, i64>(4)? as u64,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?).unwrap_or(RunStatus::Running),
        config_hash: row.get(6)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, target: u64, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, target, status, config_hash) VALUES (?1, ?2, ?3, ?4)",
            params![
                now,
                target as i64,
                RunStatus::Running.to_db_string(),
                config_hash
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus, fetched: u64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, fetched = ?2, finished_at = ?3 WHERE id = ?4",
            params![status.to_db_string(), fetched as i64, now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, target, fetched, status, config_hash
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    // ===== Repositories and Snapshots =====

    fn upsert_repository(
        &mut self,
        id: i64,
        name_owner: &str,
        language: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO repositories (id, name_owner, language, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(id) DO UPDATE SET
                 name_owner = excluded.name_owner,
                 language = excluded.language,
                 updated_at = excluded.updated_at",
            params![id, name_owner, language, now],
        )?;
        Ok(())
    }

    fn bulk_insert_snapshots(&mut self, rows: &[SnapshotRow]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO repo_star_snapshots (repo_id, snapshot_date, star_count)
                 VALUES (?1, ?2, ?3)",
            )?;
            for row in rows {
                inserted += stmt.execute(params![
                    row.repo_id,
                    row.snapshot_date.to_string(),
                    row.star_count
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn get_snapshot(&self, repo_id: i64, date: NaiveDate) -> StorageResult<Option<i64>> {
        let stars = self
            .conn
            .query_row(
                "SELECT star_count FROM repo_star_snapshots WHERE repo_id = ?1 AND snapshot_date = ?2",
                params![repo_id, date.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(stars)
    }

    // ===== Statistics =====

    fn count_repositories(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM repositories")
    }

    fn count_snapshots(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM repo_star_snapshots")
    }

    fn count_snapshots_on(&self, date: NaiveDate) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM repo_star_snapshots WHERE snapshot_date = ?1",
            params![date.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
