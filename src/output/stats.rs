//! Crawl statistics
//!
//! This module provides the counters a crawl keeps while it runs, and
//! functionality for loading and displaying the summary of a stored run.

use crate::normalize::Confidence;
use crate::output::traits::OutputError;
use crate::storage::{RunRecord, Storage};
use crate::SchapError;

/// Counters kept for a crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Bodies retrieved over the network
    pub pages_fetched: u64,

    /// Bodies served from the content cache
    pub cache_hits: u64,

    /// Failed network attempts, one per attempt
    pub fetch_errors: u64,

    /// Fetches given up after exhausting their attempts
    pub abandoned_fetches: u64,

    /// Distinct categories reported
    pub categories_discovered: u64,

    /// Products handed to the sink
    pub products_emitted: u64,

    /// Emitted products carrying low confidence
    pub low_confidence_products: u64,

    /// Feed articles skipped for lacking a required field
    pub malformed_articles: u64,

    /// Documents skipped for being structurally malformed
    pub documents_abandoned: u64,
}

impl CrawlStatistics {
    /// Total number of errors of any kind
    pub fn total_errors(&self) -> u64 {
        self.fetch_errors + self.abandoned_fetches + self.malformed_articles + self.documents_abandoned
    }

    /// Share of emitted products with neutral confidence, as a percentage
    pub fn confidence_rate(&self) -> f64 {
        if self.products_emitted == 0 {
            return 0.0;
        }
        let confident = self.products_emitted - self.low_confidence_products;
        (confident as f64 / self.products_emitted as f64) * 100.0
    }
}

/// Summary of a stored run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run: RunRecord,
    pub products: u64,
    pub low_confidence_products: u64,
    pub categories: u64,
    /// (field, count) pairs, most frequent first
    pub problem_summary: Vec<(String, u64)>,
}

/// Loads the summary of the most recent run from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(RunSummary)` - Successfully loaded summary
/// * `Err(SchapError)` - No run recorded, or the query failed
pub fn load_statistics(storage: &dyn Storage) -> Result<RunSummary, SchapError> {
    let run = storage.get_latest_run()?.ok_or_else(|| {
        OutputError::Storage("No crawl runs found in database".to_string())
    })?;

    let products = storage.count_products(run.id)?;
    let low_confidence_products = storage.count_products_by_confidence(run.id, Confidence::Low)?;
    let categories = storage.count_categories(run.id)?;
    let problem_summary = storage.get_problem_summary(run.id)?;

    Ok(RunSummary {
        run,
        products,
        low_confidence_products,
        categories,
        problem_summary,
    })
}

/// Prints crawl counters to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Fetching:");
    println!("  Pages fetched: {}", stats.pages_fetched);
    println!("  Cache hits: {}", stats.cache_hits);
    println!("  Failed attempts: {}", stats.fetch_errors);
    println!("  Abandoned fetches: {}", stats.abandoned_fetches);
    println!();

    println!("Catalog:");
    println!("  Categories discovered: {}", stats.categories_discovered);
    println!("  Products emitted: {}", stats.products_emitted);
    println!(
        "  Low confidence products: {}",
        stats.low_confidence_products
    );
    println!("  Malformed articles: {}", stats.malformed_articles);
    println!("  Abandoned documents: {}", stats.documents_abandoned);
    println!();

    println!(
        "Confidence Rate: {:.1}% ({} / {} products interpreted with certainty)",
        stats.confidence_rate(),
        stats.products_emitted - stats.low_confidence_products,
        stats.products_emitted
    );
}

/// Prints the summary of a stored run
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_run_summary(summary: &RunSummary) {
    let run = &summary.run;
    println!("Run {} ({})", run.id, run.status.to_db_string());
    println!("  Started: {}", run.started_at);
    if let Some(finished) = &run.finished_at {
        println!("  Finished: {}", finished);
    }
    println!("  Config hash: {}", run.config_hash);
    println!();

    print_statistics(&run.statistics);
    println!();

    println!("Stored:");
    println!("  Categories: {}", summary.categories);
    println!("  Products: {}", summary.products);
    println!("  Low confidence: {}", summary.low_confidence_products);
    println!();

    if !summary.problem_summary.is_empty() {
        println!("Problems by Field:");
        for (field, count) in &summary.problem_summary {
            println!("  {}: {}", field, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    #[test]
    fn test_confidence_rate() {
        let stats = CrawlStatistics {
            products_emitted: 80,
            low_confidence_products: 20,
            ..Default::default()
        };
        assert!((stats.confidence_rate() - 75.0).abs() < 0.01);
    }

    #[test]
    fn test_confidence_rate_no_products() {
        assert_eq!(CrawlStatistics::default().confidence_rate(), 0.0);
    }

    #[test]
    fn test_total_errors() {
        let stats = CrawlStatistics {
            fetch_errors: 4,
            abandoned_fetches: 1,
            malformed_articles: 2,
            documents_abandoned: 3,
            pages_fetched: 100,
            ..Default::default()
        };
        assert_eq!(stats.total_errors(), 10);
    }

    #[test]
    fn test_load_statistics_without_runs() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(load_statistics(&storage).is_err());
    }

    #[test]
    fn test_load_statistics_latest_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.create_run("first").unwrap();
        let second = storage.create_run("second").unwrap();

        let summary = load_statistics(&storage).unwrap();
        assert_eq!(summary.run.id, second);
        assert_eq!(summary.products, 0);
        assert!(summary.problem_summary.is_empty());
    }
}
