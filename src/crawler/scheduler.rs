//! Crawl scheduler - runs planned segments under a bounded worker pool
//!
//! The scheduler coordinates:
//! - Session start: credential preflight and run bookkeeping
//! - Bounded fan-out of segments (one semaphore permit per running segment)
//! - Cooperative stop once the global target is met
//! - Containment of segment failures and task panics

use crate::api::SearchApi;
use crate::crawler::planner::SegmentPlanner;
use crate::crawler::segment::{SegmentReport, SegmentRunner};
use crate::state::{CrawlSession, QuerySegment};
use crate::storage::{RunStatus, SharedStorage, Storage, StorageError, StorageResult};
use crate::Result;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Per-run settings that are not part of the shared session
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Date stamped on every snapshot, also used to plan month windows
    pub snapshot_date: NaiveDate,
    pub per_segment_cap: u32,
    /// Recorded with the run row
    pub config_hash: String,
}

/// Final progress of a crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub fetched: u64,
    pub target: u64,
    pub target_reached: bool,
    /// Segments that were started
    pub segments_run: usize,
    /// Started segments that ended in failure or panicked
    pub segments_failed: usize,
    /// Planned segments never started because the crawl stopped first
    pub segments_skipped: usize,
}

/// Drives a whole crawl session
pub struct CrawlScheduler {
    session: Arc<CrawlSession>,
    api: Arc<dyn SearchApi>,
    storage: SharedStorage,
    planner: SegmentPlanner,
    runner: SegmentRunner,
    options: SchedulerOptions,
}

impl CrawlScheduler {
    pub fn new(
        session: Arc<CrawlSession>,
        api: Arc<dyn SearchApi>,
        storage: SharedStorage,
        planner: SegmentPlanner,
        options: SchedulerOptions,
    ) -> Self {
        let runner = SegmentRunner::new(
            Arc::clone(&api),
            Arc::clone(&storage),
            Arc::clone(&session),
            options.snapshot_date,
            options.per_segment_cap,
        );
        Self {
            session,
            api,
            storage,
            planner,
            runner,
            options,
        }
    }

    pub fn session(&self) -> &Arc<CrawlSession> {
        &self.session
    }

    /// Runs the crawl to completion or until the target is met
    ///
    /// Only a failed preflight is returned as an error; segment failures
    /// are counted in the summary.
    pub async fn run(&self) -> Result<CrawlSummary> {
        let target = self.session.target();

        match self.api.preflight().await {
            Ok(status) => tracing::info!(
                "Authenticated as {}, {}/{} API points remaining",
                status.login.as_deref().unwrap_or("<unknown>"),
                status.remaining,
                status.limit
            ),
            Err(e) => {
                tracing::error!("Preflight failed: {}", e);
                if let Err(storage_err) = self.with_storage(|s| {
                    let run_id = s.create_run(target, &self.options.config_hash)?;
                    s.finish_run(run_id, RunStatus::Failed, 0)
                }) {
                    tracing::error!("Could not record failed run: {}", storage_err);
                }
                return Err(e.into());
            }
        }

        let run_id = self.with_storage(|s| s.create_run(target, &self.options.config_hash))?;
        let segments = self.planner.plan(self.options.snapshot_date);
        tracing::info!(
            "Starting crawl run {}: target {} repositories across {} segments, {} workers",
            run_id,
            target,
            segments.len(),
            self.session.workers()
        );

        let summary = self.run_segments(segments).await;

        let status = if summary.target_reached {
            RunStatus::Completed
        } else {
            RunStatus::Partial
        };
        self.with_storage(|s| s.finish_run(run_id, status, summary.fetched))?;

        tracing::info!(
            "Crawl run {} {}: {}/{} fetched, {} segments run, {} failed, {} skipped",
            run_id,
            status.to_db_string(),
            summary.fetched,
            summary.target,
            summary.segments_run,
            summary.segments_failed,
            summary.segments_skipped
        );
        Ok(summary)
    }

    /// Runs `segments` concurrently, at most `workers` at a time
    ///
    /// A segment is only started while the crawl has not stopped; the check
    /// repeats after the permit is granted since the wait can be long.
    pub async fn run_segments(&self, segments: Vec<QuerySegment>) -> CrawlSummary {
        let planned = segments.len();
        let semaphore = Arc::new(Semaphore::new(self.session.workers()));
        let mut handles: Vec<(String, JoinHandle<SegmentReport>)> = Vec::new();

        for segment in segments {
            if self.stop_requested() {
                break;
            }
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            if self.stop_requested() {
                break;
            }

            let runner = self.runner.clone();
            let query = segment.query.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                runner.run_segment(segment).await
            });
            handles.push((query, handle));
        }

        let mut summary = CrawlSummary {
            target: self.session.target(),
            segments_run: handles.len(),
            segments_skipped: planned - handles.len(),
            ..CrawlSummary::default()
        };

        for (query, handle) in handles {
            match handle.await {
                Ok(report) => {
                    if report.outcome.is_failure() {
                        summary.segments_failed += 1;
                    }
                }
                Err(e) => {
                    tracing::error!("Segment task for '{}' aborted: {}", query, e);
                    summary.segments_failed += 1;
                }
            }
        }

        summary.fetched = self.session.fetched();
        summary.target_reached = self.session.target_met();
        summary
    }

    /// Checks the stop flag, raising it if the target is met
    fn stop_requested(&self) -> bool {
        let stop = self.session.should_stop();
        if stop {
            self.session.request_stop();
        }
        stop
    }

    fn with_storage<T>(
        &self,
        f: impl FnOnce(&mut dyn Storage) -> StorageResult<T>,
    ) -> std::result::Result<T, StorageError> {
        let mut storage = self
            .storage
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        f(&mut *storage)
    }
}
