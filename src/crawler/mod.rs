//! Crawler module for star-snapshot collection
//!
//! This module contains the core crawling logic, including:
//! - Splitting the search space into capped query segments
//! - Paginating each segment and persisting its pages
//! - Running segments concurrently until the target is met

mod planner;
mod scheduler;
mod segment;

pub use planner::{SegmentPlanner, StarBand, STAR_BANDS};
pub use scheduler::{CrawlScheduler, CrawlSummary, SchedulerOptions};
pub use segment::{SegmentReport, SegmentRunner};

use crate::api::{GitHubClient, RateGovernor, SearchApi};
use crate::config::Config;
use crate::state::CrawlSession;
use crate::storage::{open_storage, SharedStorage};
use crate::Result;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the rate governor and GitHub client
/// 2. Open the storage layer
/// 3. Verify credentials
/// 4. Plan and run all segments until the target is met
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `config_hash` - Hash of the configuration file, recorded with the run
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Final progress, whether or not the target was met
/// * `Err(GhStarsError)` - Setup or credential verification failed
pub async fn crawl(config: Config, config_hash: String) -> Result<CrawlSummary> {
    // A missing token must fail before the database file is created
    let governor = RateGovernor::new(
        config.rate_limit.bucket_capacity,
        config.rate_limit.refill_per_second(),
    );
    let api: Arc<dyn SearchApi> = Arc::new(GitHubClient::from_config(&config, governor)?);

    let storage: SharedStorage = Arc::new(Mutex::new(open_storage(Path::new(
        &config.output.database_path,
    ))?));

    let session = Arc::new(CrawlSession::new(
        config.crawl.target,
        config.crawl.batch_size,
        config.crawl.workers,
    ));

    let options = SchedulerOptions {
        snapshot_date: chrono::Local::now().date_naive(),
        per_segment_cap: config.crawl.per_segment_cap,
        config_hash,
    };

    let scheduler = CrawlScheduler::new(
        session,
        api,
        storage,
        SegmentPlanner::from_config(&config.crawl),
        options,
    );
    scheduler.run().await
}
