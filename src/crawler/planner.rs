//! Segment planning
//!
//! GitHub returns at most 1000 results per search expression, however many
//! pages are requested. The planner splits "every repository with at least
//! one star" into expressions small enough to stay under that cap:
//! - Sparse high-star bands are searched whole
//! - Dense low-star bands are crossed with one-month creation windows
//!
//! Planning is pure: `today` is passed in, no I/O happens here.

use crate::config::CrawlConfig;
use crate::state::QuerySegment;
use chrono::{Datelike, NaiveDate};

/// An inclusive star-count range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarBand {
    pub min: u64,
    /// `None` means unbounded
    pub max: Option<u64>,
}

impl StarBand {
    const fn new(min: u64, max: u64) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    const fn at_least(min: u64) -> Self {
        Self { min, max: None }
    }

    /// Search qualifier for this band, e.g. `stars:100..199`
    pub fn qualifier(&self) -> String {
        match self.max {
            Some(max) => format!("stars:{}..{}", self.min, max),
            None => format!("stars:>={}", self.min),
        }
    }
}

/// Star bands, highest first
pub const STAR_BANDS: [StarBand; 17] = [
    StarBand::at_least(100_000),
    StarBand::new(50_000, 99_999),
    StarBand::new(30_000, 49_999),
    StarBand::new(20_000, 29_999),
    StarBand::new(10_000, 19_999),
    StarBand::new(5_000, 9_999),
    StarBand::new(2_000, 4_999),
    StarBand::new(1_000, 1_999),
    StarBand::new(500, 999),
    StarBand::new(200, 499),
    StarBand::new(100, 199),
    StarBand::new(50, 99),
    StarBand::new(20, 49),
    StarBand::new(10, 19),
    StarBand::new(5, 9),
    StarBand::new(2, 4),
    StarBand::new(1, 1),
];

/// Bands whose upper bound is below this are split by creation month
const DEFAULT_DENSE_BELOW: u64 = 20_000;

/// Builds the ordered list of query segments for a crawl
#[derive(Debug, Clone)]
pub struct SegmentPlanner {
    founding_year: i32,
    dense_below: u64,
    date_windows: bool,
}

impl Default for SegmentPlanner {
    fn default() -> Self {
        Self::new(2008)
    }
}

impl SegmentPlanner {
    pub fn new(founding_year: i32) -> Self {
        Self {
            founding_year,
            dense_below: DEFAULT_DENSE_BELOW,
            date_windows: true,
        }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(config.founding_year).with_date_windows(config.date_windows)
    }

    #[must_use]
    pub fn with_date_windows(mut self, enabled: bool) -> Self {
        self.date_windows = enabled;
        self
    }

    fn is_dense(&self, band: &StarBand) -> bool {
        band.max.map_or(false, |max| max < self.dense_below)
    }

    /// Plans every segment for a crawl starting on `today`
    ///
    /// Sparse bands come first. Dense bands follow, month by month from the
    /// current month back to January of the founding year, highest band
    /// first within each month.
    pub fn plan(&self, today: NaiveDate) -> Vec<QuerySegment> {
        let (sparse, dense): (Vec<StarBand>, Vec<StarBand>) =
            STAR_BANDS.iter().copied().partition(|band| !self.is_dense(band));

        let mut segments: Vec<QuerySegment> = sparse
            .iter()
            .map(|band| QuerySegment::new(band.qualifier()))
            .collect();

        let windows = if self.date_windows {
            month_windows(today, self.founding_year)
        } else {
            Vec::new()
        };

        if windows.is_empty() {
            segments.extend(dense.iter().map(|band| QuerySegment::new(band.qualifier())));
            return segments;
        }

        for (start, end) in &windows {
            for band in &dense {
                segments.push(QuerySegment::new(format!(
                    "{} created:{}..{}",
                    band.qualifier(),
                    start,
                    end
                )));
            }
        }

        tracing::debug!(
            "Planned {} segments ({} sparse bands, {} dense bands x {} months)",
            segments.len(),
            sparse.len(),
            dense.len(),
            windows.len()
        );
        segments
    }
}

/// First and last day of a calendar month
fn month_window(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, next.pred_opt()?))
}

/// Calendar months from the month of `today` back to January of `first_year`,
/// newest first
fn month_windows(today: NaiveDate, first_year: i32) -> Vec<(NaiveDate, NaiveDate)> {
    let mut windows = Vec::new();
    let (mut year, mut month) = (today.year(), today.month());

    while year >= first_year {
        if let Some(window) = month_window(year, month) {
            windows.push(window);
        }
        if month == 1 {
            year -= 1;
            month = 12;
        } else {
            month -= 1;
        }
    }
    windows
}
