use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::str::FromStr;

/// Loads the configuration from an optional TOML file and the environment
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file, or `None` for defaults
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use ghstars::config::load_config;
///
/// let config = load_config(Some(Path::new("ghstars.toml"))).unwrap();
/// println!("Workers: {}", config.crawl.workers);
/// ```
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

    validate(&config)?;

    Ok(config)
}

/// Applies environment overrides on top of file settings
///
/// `lookup` resolves a variable name to its value; the real loader passes
/// `std::env::var`, tests pass a map.
///
/// Recognised variables: `GITHUB_TOKEN`, `GITHUB_GRAPHQL_ENDPOINT`,
/// `GHSTARS_DATABASE_PATH`, `GHSTARS_TARGET`, `GHSTARS_BATCH_SIZE`,
/// `GHSTARS_WORKERS`.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup("GITHUB_TOKEN").filter(|t| !t.trim().is_empty()) {
        config.github.token = Some(token);
    }

    if let Some(endpoint) = lookup("GITHUB_GRAPHQL_ENDPOINT") {
        config.github.endpoint = endpoint;
    }

    if let Some(path) = lookup("GHSTARS_DATABASE_PATH") {
        config.output.database_path = path;
    }

    if let Some(value) = lookup("GHSTARS_TARGET") {
        config.crawl.target = parse_env("GHSTARS_TARGET", value)?;
    }

    if let Some(value) = lookup("GHSTARS_BATCH_SIZE") {
        config.crawl.batch_size = parse_env("GHSTARS_BATCH_SIZE", value)?;
    }

    if let Some(value) = lookup("GHSTARS_WORKERS") {
        config.crawl.workers = parse_env("GHSTARS_WORKERS", value)?;
    }

    Ok(())
}

fn parse_env<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is recorded with every run so results can be traced back to the
/// settings that produced them.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Loads a configuration and returns both the config and its hash
///
/// Without a file the hash is that of empty content, so runs driven purely
/// by the environment share one hash.
pub fn load_config_with_hash(path: Option<&Path>) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = match path {
        Some(path) => compute_config_hash(path)?,
        None => hash_content(""),
    };
    Ok((config, hash))
}
