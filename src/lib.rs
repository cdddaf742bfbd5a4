//! ghstars: a GitHub star-count crawler
//!
//! This crate pages through the GitHub GraphQL search API and records a
//! point-in-time star snapshot for every repository it sees. The search API
//! caps every query at 1000 results, so the crawl is split into many small
//! star-band and creation-month segments that run concurrently behind a shared
//! token-bucket governor.

pub mod api;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for ghstars operations
#[derive(Debug, Error)]
pub enum GhStarsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("GitHub API error: {0}")]
    Api(#[from] api::ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid value for environment variable {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Missing GitHub token (set GITHUB_TOKEN or github.token)")]
    MissingToken,
}

/// Result type alias for ghstars operations
pub type Result<T> = std::result::Result<T, GhStarsError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use api::{GitHubClient, RateGovernor, RepoRecord, RetryPolicy, SearchApi, SearchPage};
pub use config::Config;
pub use crawler::{CrawlScheduler, CrawlSummary, SegmentPlanner, SegmentRunner};
pub use state::{CrawlSession, QuerySegment, SegmentOutcome};
