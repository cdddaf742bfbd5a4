use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Process-wide progress of one crawl
///
/// The fetched counter and the stop flag are the only fields written by
/// concurrent segments. Both are atomics, so increments are never lost and
/// exactly one segment wins the stop transition.
#[derive(Debug)]
pub struct CrawlSession {
    target: u64,
    batch_size: u32,
    workers: usize,
    fetched: AtomicU64,
    stop: AtomicBool,
}

impl CrawlSession {
    pub fn new(target: u64, batch_size: u32, workers: usize) -> Self {
        Self {
            target,
            batch_size,
            workers: workers.max(1),
            fetched: AtomicU64::new(0),
            stop: AtomicBool::new(false),
        }
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Repositories persisted so far across all segments
    pub fn fetched(&self) -> u64 {
        self.fetched.load(Ordering::SeqCst)
    }

    /// Adds `count` persisted repositories and returns the new total
    pub fn record_fetched(&self, count: u64) -> u64 {
        self.fetched.fetch_add(count, Ordering::SeqCst) + count
    }

    pub fn target_met(&self) -> bool {
        self.fetched() >= self.target
    }

    /// Repositories still needed to reach the target
    pub fn remaining(&self) -> u64 {
        self.target.saturating_sub(self.fetched())
    }

    /// Raises the stop flag
    ///
    /// # Returns
    ///
    /// * `true` - This call raised the flag
    /// * `false` - The flag was already set
    pub fn request_stop(&self) -> bool {
        self.stop
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// True once the flag is up or the target is met
    pub fn should_stop(&self) -> bool {
        self.is_stopped() || self.target_met()
    }
}
