//! Configuration module for ghstars
//!
//! Settings come from an optional TOML file, then environment variables
//! override individual keys, then the result is validated.
//!
//! # Example
//!
//! ```no_run
//! use ghstars::config::load_config;
//!
//! let config = load_config(None).unwrap();
//! println!("Crawling {} repositories", config.crawl.target);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, GitHubConfig, OutputConfig, RateLimitConfig, RetryConfig,
    DEFAULT_GRAPHQL_ENDPOINT,
};

// Re-export parser functions
pub use parser::{apply_env_overrides, compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;

use crate::{ConfigError, ConfigResult};

impl Config {
    /// Returns the API token, failing if none was configured
    pub fn require_token(&self) -> ConfigResult<&str> {
        match self.github.token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(ConfigError::MissingToken),
        }
    }
}
