//! Segment state definitions for tracking pagination progress
//!
//! A segment paginates one search expression from the first page until it
//! reaches one of the terminal outcomes below.
use std::fmt;

/// One search expression together with its pagination progress
///
/// Owned by the single runner that paginates it, so no locking is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySegment {
    /// Search expression, e.g. `stars:100..199 created:2024-05-01..2024-05-31`
    pub query: String,

    /// Cursor for the next page, `None` before the first page
    pub cursor: Option<String>,

    /// Repositories persisted by this segment so far
    pub fetched: u32,
}

impl QuerySegment {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            cursor: None,
            fetched: 0,
        }
    }

    /// Records a persisted page and moves to its cursor
    pub fn advance(&mut self, count: u32, cursor: Option<String>) {
        self.fetched = self.fetched.saturating_add(count);
        self.cursor = cursor;
    }
}

/// Terminal state of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentOutcome {
    // ===== Normal Completion =====
    /// The search returned its last page
    Exhausted,

    /// The per-query result cap was reached before the last page
    CappedOut,

    // ===== Session Stop =====
    /// This segment observed the global target being met and raised the stop flag
    TargetReached,

    /// Another segment raised the stop flag first
    StoppedExternally,

    // ===== Error =====
    /// A fetch (after retries) or persistence step failed
    Failed,
}

impl SegmentOutcome {
    /// Returns true if the global target was met while this segment ran
    pub fn target_reached(&self) -> bool {
        matches!(self, Self::TargetReached)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::CappedOut => "capped_out",
            Self::TargetReached => "target_reached",
            Self::StoppedExternally => "stopped_externally",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SegmentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
