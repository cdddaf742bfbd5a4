//! Output module for reporting on the snapshot database
//!
//! This module handles:
//! - Loading repository, snapshot and run statistics
//! - Printing them for the `--stats` command

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};
