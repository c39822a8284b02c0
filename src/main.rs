//! Schap main entry point
//!
//! This is the command-line interface for the Schap catalog crawler.

use clap::Parser;
use schap::config::{load_config_with_hash, Config, NavigationMode};
use schap::crawler::{run_crawl, Coordinator};
use schap::output::{load_statistics, print_run_summary, print_statistics, MemorySink};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Schap: a retailer catalog crawler
///
/// Schap walks a retailer's category navigation, fetches the product feed
/// behind every category and stores canonical product records, each with
/// a confidence signal, in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "schap")]
#[command(version)]
#[command(about = "A retailer catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Empty the content cache before crawling
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "image"])]
    dry_run: bool,

    /// Show statistics of the latest run from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "image"])]
    stats: bool,

    /// Download a single product image and exit
    #[arg(long, value_name = "URI", requires = "image_output")]
    image: Option<String>,

    /// Where to write the downloaded image
    #[arg(long, value_name = "PATH", requires = "image")]
    image_output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let (Some(uri), Some(output)) = (cli.image, cli.image_output) {
        handle_image(config, &uri, &output).await?;
    } else {
        handle_crawl(config, &config_hash, cli.fresh).await?;
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
            0 => EnvFilter::new("schap=info,warn"),
            1 => EnvFilter::new("schap=debug,info"),
            2 => EnvFilter::new("schap=trace,debug"),
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

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Schap Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Rate limit: {}ms", config.crawler.rate_limit_ms);
    println!(
        "  Retry delay: {}ms (x{} per attempt, at most {}ms)",
        config.crawler.retry_delay_ms, config.crawler.retry_backoff, config.crawler.max_retry_delay_ms
    );
    match config.crawler.max_attempts {
        Some(max) => println!("  Max attempts: {}", max),
        None => println!("  Max attempts: unbounded"),
    }
    if config.crawler.cache {
        println!("  Cache: {}", config.crawler.cache_path);
    } else {
        println!("  Cache: disabled");
    }
    println!(
        "  On malformed document: {:?}",
        config.crawler.on_document_error
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    let retailer = &config.retailer;
    println!("\nRetailer: {}", retailer.name);
    let navigation = match retailer.navigation {
        NavigationMode::Markup => "markup",
        NavigationMode::MenuApi => "menu-api",
    };
    println!("  Navigation: {}", navigation);
    println!("  Root: {}", retailer.root_url);
    if let Some(submenu) = &retailer.submenu_url {
        println!("  Submenu: {}", submenu);
    }
    println!("  Feed: {}", retailer.feed_url);
    println!("  Default brand: {}", retailer.default_brand);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling at {}", retailer.root_url);
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use schap::storage::SqliteStorage;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    // Open the database
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    // Load statistics
    let summary = load_statistics(&storage)?;

    // Print statistics
    print_run_summary(&summary);

    Ok(())
}

/// Handles the --image mode: downloads one image through the fetch path
async fn handle_image(
    config: Config,
    uri: &str,
    output: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut coordinator = Coordinator::new(config, MemorySink::new())?;
    let bytes = coordinator.download_image(uri).await?;

    tokio::fs::write(output, &bytes).await?;
    tracing::info!("Wrote {} bytes to {}", bytes.len(), output.display());

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: &str,
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if fresh {
        tracing::info!("Starting fresh crawl (cache will be cleared)");
    }

    tracing::info!(
        "Retailer: {}, rate limit: {}ms, cache: {}",
        config.retailer.name,
        config.crawler.rate_limit_ms,
        config.crawler.cache
    );

    // Run the crawler
    match run_crawl(config, config_hash, fresh).await {
        Ok(stats) => {
            tracing::info!("Crawl completed successfully");
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
