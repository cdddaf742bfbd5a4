use crate::config::types::{Config, CrawlConfig, GitHubConfig, RateLimitConfig, RetryConfig};
use crate::ConfigError;
use url::Url;

/// GitHub rejects `first:` values above this
const MAX_BATCH_SIZE: u32 = 100;

/// Absolute number of results GitHub returns for one search expression
const SEARCH_RESULT_CAP: u32 = 1000;

const MAX_WORKERS: usize = 32;

/// Validates the entire configuration
///
/// The token is not checked here, since `--dry-run` and `--stats` never
/// talk to GitHub. Crawl mode calls [`Config::require_token`].
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_github_config(&config.github)?;
    validate_crawl_config(&config.crawl)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_retry_config(&config.retry)?;

    if config.output.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_github_config(config: &GitHubConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid endpoint: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "Endpoint '{}' must use http or https",
            config.endpoint
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, config.batch_size
        )));
    }

    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.per_segment_cap < 1 || config.per_segment_cap > SEARCH_RESULT_CAP {
        return Err(ConfigError::Validation(format!(
            "per_segment_cap must be between 1 and {}, got {}",
            SEARCH_RESULT_CAP, config.per_segment_cap
        )));
    }

    if !(2007..=2100).contains(&config.founding_year) {
        return Err(ConfigError::Validation(format!(
            "founding_year out of range: {}",
            config.founding_year
        )));
    }

    Ok(())
}

fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.refill_per_minute == 0 {
        return Err(ConfigError::Validation(
            "refill_per_minute must be > 0".to_string(),
        ));
    }

    if config.estimated_cost == 0 {
        return Err(ConfigError::Validation(
            "estimated_cost must be >= 1".to_string(),
        ));
    }

    if config.bucket_capacity < config.estimated_cost {
        return Err(ConfigError::Validation(format!(
            "bucket_capacity ({}) must be >= estimated_cost ({})",
            config.bucket_capacity, config.estimated_cost
        )));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "max_attempts must be >= 1".to_string(),
        ));
    }

    if config.base_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "base_delay_ms ({}) cannot exceed max_delay_ms ({})",
            config.base_delay_ms, config.max_delay_ms
        )));
    }

    Ok(())
}
