//! Segment runner - paginates one search expression to a terminal outcome
//!
//! Before every page the runner checks, in this order:
//! 1. Stop flag already raised by another segment
//! 2. Global target met (this segment raises the flag)
//! 3. Per-segment cap reached
//!
//! Any error ends only the current segment. Counters move only after a page
//! was persisted, so a failed page never shows up in the totals.

use crate::api::{RepoRecord, SearchApi, SearchPage};
use crate::state::{CrawlSession, QuerySegment, SegmentOutcome};
use crate::storage::{SharedStorage, SnapshotRow, StorageError, StorageResult};
use chrono::NaiveDate;
use std::sync::Arc;

/// What a finished segment reports back to the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentReport {
    pub query: String,
    pub outcome: SegmentOutcome,
    /// Repositories this segment persisted
    pub fetched: u32,
    /// Error that ended a failed segment
    pub error: Option<String>,
}

impl SegmentReport {
    pub fn target_reached(&self) -> bool {
        self.outcome.target_reached()
    }
}

/// Runs segments against a shared client, storage and session
///
/// Cheap to clone; every spawned segment task gets its own copy.
#[derive(Clone)]
pub struct SegmentRunner {
    api: Arc<dyn SearchApi>,
    storage: SharedStorage,
    session: Arc<CrawlSession>,
    snapshot_date: NaiveDate,
    per_segment_cap: u32,
}

impl SegmentRunner {
    /// Creates a runner
    ///
    /// # Arguments
    ///
    /// * `api` - Search client
    /// * `storage` - Persistence shared by all segments
    /// * `session` - Global counter and stop flag
    /// * `snapshot_date` - Date stamped on every snapshot of this run
    /// * `per_segment_cap` - Most repositories taken from one expression
    pub fn new(
        api: Arc<dyn SearchApi>,
        storage: SharedStorage,
        session: Arc<CrawlSession>,
        snapshot_date: NaiveDate,
        per_segment_cap: u32,
    ) -> Self {
        Self {
            api,
            storage,
            session,
            snapshot_date,
            per_segment_cap,
        }
    }

    pub fn session(&self) -> &Arc<CrawlSession> {
        &self.session
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    /// Paginates `segment` until it reaches a terminal outcome
    pub async fn run_segment(&self, mut segment: QuerySegment) -> SegmentReport {
        let (outcome, error) = self.paginate(&mut segment).await;

        match outcome {
            SegmentOutcome::Failed => tracing::warn!(
                "Segment '{}' failed after {} repos: {}",
                segment.query,
                segment.fetched,
                error.as_deref().unwrap_or("unknown error")
            ),
            _ => tracing::info!(
                "Segment '{}' finished ({}): {} repos",
                segment.query,
                outcome,
                segment.fetched
            ),
        }

        SegmentReport {
            query: segment.query,
            outcome,
            fetched: segment.fetched,
            error,
        }
    }

    async fn paginate(&self, segment: &mut QuerySegment) -> (SegmentOutcome, Option<String>) {
        loop {
            if self.session.is_stopped() {
                return (SegmentOutcome::StoppedExternally, None);
            }
            if self.session.target_met() {
                if self.session.request_stop() {
                    tracing::info!(
                        "Target of {} repositories reached, stopping crawl",
                        self.session.target()
                    );
                }
                return (SegmentOutcome::TargetReached, None);
            }
            if segment.fetched >= self.per_segment_cap {
                return (SegmentOutcome::CappedOut, None);
            }

            // One past the target is enough to cross it
            let target_left =
                u32::try_from(self.session.remaining().saturating_add(1)).unwrap_or(u32::MAX);
            let first = self
                .session
                .batch_size()
                .min(self.per_segment_cap - segment.fetched)
                .min(target_left);

            let page = match self
                .api
                .search(&segment.query, segment.cursor.as_deref(), first)
                .await
            {
                Ok(page) => page,
                Err(e) => return (SegmentOutcome::Failed, Some(e.to_string())),
            };

            if page.repos.is_empty() {
                return (SegmentOutcome::Exhausted, None);
            }

            let SearchPage {
                repos,
                end_cursor,
                has_next_page,
                cost,
                remaining,
            } = page;
            let count = repos.len() as u32;

            if let Err(e) = self.persist_page(repos).await {
                return (SegmentOutcome::Failed, Some(e.to_string()));
            }

            let total = self.session.record_fetched(u64::from(count));
            tracing::debug!(
                "{}/{} fetched (+{} from '{}'), cost={} remaining={}",
                total,
                self.session.target(),
                count,
                segment.query,
                cost,
                remaining
            );
            segment.advance(count, end_cursor);

            if !has_next_page || segment.cursor.is_none() {
                return (SegmentOutcome::Exhausted, None);
            }
        }
    }

    /// Upserts every repository of a page, then inserts its snapshots,
    /// under one storage lock
    ///
    /// SQLite work runs on the blocking pool so a slow disk does not hold up
    /// the other segments' requests.
    async fn persist_page(&self, repos: Vec<RepoRecord>) -> StorageResult<()> {
        let storage = Arc::clone(&self.storage);
        let snapshot_date = self.snapshot_date;

        tokio::task::spawn_blocking(move || -> StorageResult<()> {
            let mut storage = storage.lock().map_err(|_| StorageError::LockPoisoned)?;

            for repo in &repos {
                storage.upsert_repository(
                    repo.id,
                    &repo.name_with_owner,
                    repo.language.as_deref(),
                )?;
            }

            let rows: Vec<SnapshotRow> = repos
                .iter()
                .map(|repo| SnapshotRow {
                    repo_id: repo.id,
                    snapshot_date,
                    star_count: repo.stars,
                })
                .collect();
            storage.bulk_insert_snapshots(&rows)?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
    }
}
