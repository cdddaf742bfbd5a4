//! Statistics generation from the snapshot database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::GhStarsError;
use chrono::NaiveDate;

/// Database statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Distinct repositories ever seen
    pub total_repositories: u64,

    /// Snapshot rows across all dates
    pub total_snapshots: u64,

    /// Snapshot rows taken on the reporting date
    pub snapshots_today: u64,

    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `today` - Date whose snapshots are counted separately
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(GhStarsError)` - Failed to query statistics
pub fn load_statistics(
    storage: &dyn Storage,
    today: NaiveDate,
) -> Result<CrawlStatistics, GhStarsError> {
    Ok(CrawlStatistics {
        total_repositories: storage.count_repositories()?,
        total_snapshots: storage.count_snapshots()?,
        snapshots_today: storage.count_snapshots_on(today)?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Star Snapshot Statistics ===\n");

    println!("Overview:");
    println!("  Repositories: {}", stats.total_repositories);
    println!("  Snapshots (all dates): {}", stats.total_snapshots);
    println!("  Snapshots today: {}", stats.snapshots_today);
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run (#{}):", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            println!(
                "  Finished: {}",
                run.finished_at.as_deref().unwrap_or("still running")
            );
            let percentage = if run.target > 0 {
                (run.fetched as f64 / run.target as f64) * 100.0
            } else {
                0.0
            };
            println!(
                "  Fetched: {} / {} ({:.1}%)",
                run.fetched, run.target, percentage
            );
        }
        None => println!("No crawl runs recorded yet."),
    }
}
