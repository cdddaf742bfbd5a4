//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlSession`: Shared target, fetched counter and stop flag for one crawl
//! - `QuerySegment`: One search expression with its cursor and per-segment count
//! - `SegmentOutcome`: Terminal state a segment finishes in

mod segment_state;
mod session;

// Re-export main types
pub use segment_state::{QuerySegment, SegmentOutcome};
pub use session::CrawlSession;
