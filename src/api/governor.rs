//! Token-bucket rate governor shared by every outbound request
//!
//! GitHub's secondary limits are counted per token, not per connection, so
//! one bucket gates all segments. Refill and debit happen under a single
//! async mutex, and a waiting caller keeps the lock while it sleeps: requests
//! are admitted strictly one at a time.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Lowest refill rate accepted, to keep wait computations finite
const MIN_REFILL_RATE: f64 = 1e-6;

/// Token bucket state
///
/// Invariant: `0 <= tokens <= capacity`. Tokens only go down through
/// [`RateBucket::try_debit`].
#[derive(Debug, Clone)]
pub struct RateBucket {
    capacity: f64,
    tokens: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl RateBucket {
    /// Creates a full bucket
    pub fn new(capacity: u32, refill_per_second: f64, now: Instant) -> Self {
        let capacity = f64::from(capacity);
        Self {
            capacity,
            tokens: capacity,
            refill_rate: refill_per_second.max(MIN_REFILL_RATE),
            last_refill: now,
        }
    }

    /// Adds the tokens earned since the last refill, capped at capacity
    pub fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Debits `cost` tokens, or returns how long until they would be available
    pub fn try_debit(&mut self, cost: f64) -> Result<(), Duration> {
        if self.tokens >= cost {
            self.tokens -= cost;
            Ok(())
        } else {
            let deficit = cost - self.tokens;
            Err(Duration::from_secs_f64(deficit / self.refill_rate))
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }
}

/// Shared, cloneable handle to the process-wide token bucket
#[derive(Debug, Clone)]
pub struct RateGovernor {
    bucket: Arc<Mutex<RateBucket>>,
    capacity: u32,
}

impl RateGovernor {
    /// Creates a governor with a full bucket
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum tokens (GraphQL points) held at once
    /// * `refill_per_second` - Tokens restored per second
    pub fn new(capacity: u32, refill_per_second: f64) -> Self {
        Self {
            bucket: Arc::new(Mutex::new(RateBucket::new(
                capacity,
                refill_per_second,
                Instant::now(),
            ))),
            capacity,
        }
    }

    /// Waits until `cost` tokens are available, then debits them
    ///
    /// A cost above capacity could never be satisfied, so it is clamped to
    /// capacity.
    pub async fn acquire(&self, cost: u32) {
        let cost = if cost > self.capacity {
            tracing::warn!(
                "Request cost {} exceeds bucket capacity {}, clamping",
                cost,
                self.capacity
            );
            self.capacity
        } else {
            cost
        };

        let mut bucket = self.bucket.lock().await;
        loop {
            bucket.refill(Instant::now());
            match bucket.try_debit(f64::from(cost)) {
                Ok(()) => return,
                Err(wait) => {
                    tracing::trace!("Rate governor waiting {:?} for {} tokens", wait, cost);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Current token count after a lazy refill
    pub async fn available(&self) -> f64 {
        let mut bucket = self.bucket.lock().await;
        bucket.refill(Instant::now());
        bucket.tokens()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}
