//! GitHub API access
//!
//! # Components
//!
//! - `GitHubClient`: GraphQL search client implementing `SearchApi`
//! - `RateGovernor`: Process-wide token bucket every request is charged against
//! - `RetryPolicy`: Attempt ceiling and backoff for transient failures
//! - `ApiError`: Error taxonomy plus HTTP status classification

mod client;
mod error;
mod governor;
mod retry;
mod types;

pub use client::{build_http_client, GitHubClient, SearchApi};
pub use error::{classify_status, ApiError};
pub use governor::{RateBucket, RateGovernor};
pub use retry::RetryPolicy;
pub use types::{RateLimitStatus, RepoRecord, SearchPage};
