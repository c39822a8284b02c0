//! Storage traits and error types
//!
//! This module defines the trait interfaces for storage backends and
//! associated error types:
//! - `Storage`: run history and the scraped catalog
//! - `ContentCache`: fetched bodies keyed by request URI

use crate::catalog::{Category, ScrapedProduct};
use crate::normalize::Confidence;
use crate::output::CrawlStatistics;
use crate::storage::RunRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed to record a crawl.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as completed and records its final statistics
    fn complete_run(&mut self, run_id: i64, statistics: &CrawlStatistics) -> StorageResult<()>;

    /// Marks a run as failed and records the statistics gathered so far
    fn fail_run(&mut self, run_id: i64, statistics: &CrawlStatistics) -> StorageResult<()>;

    // ===== Catalog =====

    /// Records a discovered category
    ///
    /// A category id seen twice in the same run keeps its first record.
    fn upsert_category(&mut self, run_id: i64, category: &Category) -> StorageResult<()>;

    /// Records a scraped product
    ///
    /// # Returns
    ///
    /// The row ID of the stored product
    fn insert_product(&mut self, run_id: i64, product: &ScrapedProduct) -> StorageResult<i64>;

    /// Gets every product of a run in insertion order
    fn get_products(&self, run_id: i64) -> StorageResult<Vec<ScrapedProduct>>;

    /// Gets every category of a run in discovery order
    fn get_categories(&self, run_id: i64) -> StorageResult<Vec<Category>>;

    // ===== Statistics =====

    /// Counts the products of a run
    fn count_products(&self, run_id: i64) -> StorageResult<u64>;

    /// Counts the products of a run with the given confidence
    fn count_products_by_confidence(
        &self,
        run_id: i64,
        confidence: Confidence,
    ) -> StorageResult<u64>;

    /// Counts the categories of a run
    fn count_categories(&self, run_id: i64) -> StorageResult<u64>;

    /// Gets how often each field was reported as a problem in a run
    ///
    /// Returns (field, count) pairs, most frequent first
    fn get_problem_summary(&self, run_id: i64) -> StorageResult<Vec<(String, u64)>>;
}

/// Keyed store of fetched bodies
///
/// Keys are full request URIs. Only successful responses are stored.
pub trait ContentCache {
    /// Looks up a cached body
    fn get(&self, uri: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Stores a body, replacing any earlier entry for the same URI
    fn put(&mut self, uri: &str, body: &[u8]) -> StorageResult<()>;

    /// Removes every entry
    fn clear(&mut self) -> StorageResult<()>;
}
