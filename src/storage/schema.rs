//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the ghstars database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    target INTEGER NOT NULL,
    fetched INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL,
    config_hash TEXT NOT NULL
);

-- Repository metadata, keyed by GitHub's numeric id
CREATE TABLE IF NOT EXISTS repositories (
    id INTEGER PRIMARY KEY,
    name_owner TEXT NOT NULL,
    language TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_repositories_name_owner ON repositories(name_owner);

-- One star count per repository per day
CREATE TABLE IF NOT EXISTS repo_star_snapshots (
    repo_id INTEGER NOT NULL REFERENCES repositories(id),
    snapshot_date TEXT NOT NULL,
    star_count INTEGER NOT NULL,
    PRIMARY KEY (repo_id, snapshot_date)
);

CREATE INDEX IF NOT EXISTS idx_snapshots_date ON repo_star_snapshots(snapshot_date);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
