use serde::Deserialize;
use std::time::Duration;

/// Default GitHub GraphQL endpoint
pub const DEFAULT_GRAPHQL_ENDPOINT: &str = "https://api.github.com/graphql";

/// Main configuration structure for ghstars
///
/// Every section and key is optional; missing values fall back to the
/// defaults below so the crawler can run from environment variables alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default, rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// GitHub API access configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GitHubConfig {
    /// Personal access token; usually supplied through `GITHUB_TOKEN`
    pub token: Option<String>,

    /// GraphQL endpoint URL
    pub endpoint: String,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            endpoint: DEFAULT_GRAPHQL_ENDPOINT.to_string(),
            user_agent: format!("ghstars/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Crawl sizing and segmentation
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Number of repositories to fetch before stopping
    pub target: u64,

    /// Page size for each search request (GitHub allows at most 100)
    pub batch_size: u32,

    /// Number of segments paginated concurrently
    pub workers: usize,

    /// Enforced per-query fetch ceiling, kept under GitHub's 1000 result cap
    pub per_segment_cap: u32,

    /// First year searched by the creation-month windows
    pub founding_year: i32,

    /// Whether dense star bands are split into creation-month windows
    pub date_windows: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            target: 100_000,
            batch_size: 100,
            workers: 3,
            per_segment_cap: 980,
            founding_year: 2008,
            date_windows: true,
        }
    }
}

/// Token bucket settings for the shared rate governor
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RateLimitConfig {
    /// Maximum number of points the bucket can hold
    pub bucket_capacity: u32,

    /// Points restored per minute
    pub refill_per_minute: u32,

    /// Fixed pause before every request (milliseconds)
    pub inter_request_delay_ms: u64,

    /// Points charged up front before the true request cost is known
    pub estimated_cost: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            bucket_capacity: 200,
            refill_per_minute: 900,
            inter_request_delay_ms: 150,
            estimated_cost: 1,
        }
    }
}

impl RateLimitConfig {
    /// Refill rate in points per second
    pub fn refill_per_second(&self) -> f64 {
        f64::from(self.refill_per_minute) / 60.0
    }

    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_millis(self.inter_request_delay_ms)
    }
}

/// Retry policy for transient API failures
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Total attempts per request, including the first one
    pub max_attempts: u32,

    /// First backoff delay (milliseconds), doubled on every retry
    pub base_delay_ms: u64,

    /// Upper bound for a single backoff delay (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "ghstars.db".to_string(),
        }
    }
}
