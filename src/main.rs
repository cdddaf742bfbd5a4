//! ghstars main entry point
//!
//! This is the command-line interface for the GitHub star-snapshot crawler.

use anyhow::Context;
use clap::Parser;
use ghstars::config::{load_config_with_hash, validate, Config};
use ghstars::crawler::{crawl, SegmentPlanner};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Number of planned queries listed by --dry-run
const DRY_RUN_PREVIEW: usize = 20;

/// ghstars: daily GitHub star snapshots
///
/// ghstars pages through the GitHub GraphQL search API, splitting the
/// search space into star bands and creation months so that every query
/// stays under the 1000-result cap, and records one star count per
/// repository per day.
#[derive(Parser, Debug)]
#[command(name = "ghstars")]
#[command(version)]
#[command(about = "Record daily GitHub star snapshots", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (optional, environment variables also apply)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Number of repositories to fetch before stopping
    #[arg(long)]
    target: Option<u64>,

    /// Repositories requested per page (1-100)
    #[arg(long)]
    batch: Option<u32>,

    /// Segments paginated concurrently
    #[arg(long)]
    workers: Option<usize>,

    /// Search dense star bands whole instead of month by month
    #[arg(long)]
    no_date_windows: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the segment plan without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

impl Cli {
    /// Applies command-line overrides on top of file and environment settings
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(target) = self.target {
            config.crawl.target = target;
        }
        if let Some(batch) = self.batch {
            config.crawl.batch_size = batch;
        }
        if let Some(workers) = self.workers {
            config.crawl.workers = workers;
        }
        if self.no_date_windows {
            config.crawl.date_windows = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match &cli.config {
        Some(path) => tracing::info!("Loading configuration from: {}", path.display()),
        None => tracing::info!("No configuration file given, using defaults and environment"),
    }
    let (mut config, config_hash) =
        load_config_with_hash(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    validate(&config).context("Invalid command-line override")?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ghstars=info,warn"),
            1 => EnvFilter::new("ghstars=debug,info"),
            2 => EnvFilter::new("ghstars=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows settings and the planned segments
fn handle_dry_run(config: &Config) {
    println!("=== ghstars Dry Run ===\n");

    println!("GitHub:");
    println!("  Endpoint: {}", config.github.endpoint);
    println!(
        "  Token: {}",
        if config.require_token().is_ok() {
            "set"
        } else {
            "MISSING (set GITHUB_TOKEN)"
        }
    );

    println!("\nCrawl:");
    println!("  Target: {}", config.crawl.target);
    println!("  Batch size: {}", config.crawl.batch_size);
    println!("  Workers: {}", config.crawl.workers);
    println!("  Per-segment cap: {}", config.crawl.per_segment_cap);

    println!("\nRate Limit:");
    println!(
        "  Bucket: {} points, refill {}/min, {}ms between requests",
        config.rate_limit.bucket_capacity,
        config.rate_limit.refill_per_minute,
        config.rate_limit.inter_request_delay_ms
    );
    println!(
        "  Retry: {} attempts, {}ms base, {}ms cap",
        config.retry.max_attempts, config.retry.base_delay_ms, config.retry.max_delay_ms
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let today = chrono::Local::now().date_naive();
    let segments = SegmentPlanner::from_config(&config.crawl).plan(today);
    println!("\nPlanned Segments ({}):", segments.len());
    for segment in segments.iter().take(DRY_RUN_PREVIEW) {
        println!("  - {}", segment.query);
    }
    if segments.len() > DRY_RUN_PREVIEW {
        println!("  ... and {} more", segments.len() - DRY_RUN_PREVIEW);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use ghstars::output::{load_statistics, print_statistics};
    use ghstars::storage::SqliteStorage;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage, chrono::Local::now().date_naive())?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling up to {} repositories into {}",
        config.crawl.target,
        config.output.database_path
    );

    match crawl(config, config_hash).await {
        Ok(summary) => {
            println!(
                "Fetched {}/{} repositories ({})",
                summary.fetched,
                summary.target,
                if summary.target_reached {
                    "target reached"
                } else {
                    "target not reached"
                }
            );
            if summary.segments_failed > 0 {
                println!("{} segments failed, see log for details", summary.segments_failed);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
