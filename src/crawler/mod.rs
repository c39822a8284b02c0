//! Crawler module for catalog fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with error classification
//! - Global rate limiting and retry timing
//! - The re-entrant fetch work queue with content caching
//! - Retailer JSON payloads
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod limiter;
mod payload;
mod scheduler;

pub use coordinator::{build_collaborators, Coordinator, CrawlState};
pub use fetcher::{build_http_client, user_agent_string, HttpFetcher, ReqwestFetcher, Response};
pub use limiter::{RateLimiter, RetryPolicy};
pub use payload::{parse_feed, parse_menu, CHILDREN_MENU_KEY, ROOT_MENU_KEY};
pub use scheduler::{Completion, FetchCounters, PendingFetch, Scheduler, WorkQueue};

use crate::config::Config;
use crate::output::{CrawlStatistics, SqliteCatalogSink};
use crate::storage::{open_storage, Storage};
use crate::Result;
use std::path::Path;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client and content cache
/// 2. Open the output database and record a new run
/// 3. Crawl categories and product feeds into the run
/// 4. Mark the run completed or failed with its statistics
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `config_hash` - Hash of the configuration file, stored with the run
/// * `fresh` - Whether to empty the content cache first
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Crawl completed successfully
/// * `Err(SchapError)` - Crawl failed
pub async fn run_crawl(config: Config, config_hash: &str, fresh: bool) -> Result<CrawlStatistics> {
    let (fetcher, mut cache) = build_collaborators(&config)?;
    if fresh {
        if let Some(cache) = cache.as_mut() {
            tracing::info!("Clearing content cache");
            cache.clear()?;
        }
    }

    let mut storage = open_storage(Path::new(&config.output.database_path))?;
    let run_id = storage.create_run(config_hash)?;
    tracing::info!("Recording crawl as run {}", run_id);

    let sink = SqliteCatalogSink::new(storage, run_id);
    let mut coordinator = Coordinator::with_parts(config, fetcher, cache, sink);

    let result = coordinator.run().await;
    let stats = coordinator.statistics();
    let mut sink = coordinator.into_sink();

    match result {
        Ok(_) => {
            sink.complete(&stats)?;
            Ok(stats)
        }
        Err(e) => {
            tracing::error!("Run {} failed: {}", run_id, e);
            if let Err(finalize_error) = sink.fail(&stats) {
                tracing::error!("Failed to mark run {} as failed: {}", run_id, finalize_error);
            }
            Err(e)
        }
    }
}
