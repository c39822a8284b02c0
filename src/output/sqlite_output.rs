//! SQLite-based catalog sink
//!
//! This module provides a sink that writes categories and products
//! straight into the run tables of the SQLite storage backend.

use crate::catalog::{Category, ScrapedProduct};
use crate::output::stats::CrawlStatistics;
use crate::output::traits::{CatalogSink, OutputError, OutputResult, ProductSink};
use crate::storage::{SqliteStorage, Storage};

/// SQLite-based catalog sink
///
/// Every record is tagged with the run the sink was created for.
pub struct SqliteCatalogSink {
    storage: SqliteStorage,
    run_id: i64,
}

impl SqliteCatalogSink {
    /// Creates a new SQLite catalog sink
    ///
    /// # Arguments
    ///
    /// * `storage` - The storage backend to write to
    /// * `run_id` - The run the records belong to
    pub fn new(storage: SqliteStorage, run_id: i64) -> Self {
        Self { storage, run_id }
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Marks the run as completed with its final statistics
    pub fn complete(&mut self, stats: &CrawlStatistics) -> OutputResult<()> {
        self.storage
            .complete_run(self.run_id, stats)
            .map_err(|e| OutputError::Storage(e.to_string()))
    }

    /// Marks the run as failed with the statistics gathered so far
    pub fn fail(&mut self, stats: &CrawlStatistics) -> OutputResult<()> {
        self.storage
            .fail_run(self.run_id, stats)
            .map_err(|e| OutputError::Storage(e.to_string()))
    }
}

impl ProductSink for SqliteCatalogSink {
    fn on_product(&mut self, product: ScrapedProduct) -> OutputResult<()> {
        self.storage
            .insert_product(self.run_id, &product)
            .map_err(|e| OutputError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl CatalogSink for SqliteCatalogSink {
    fn record_category(&mut self, category: &Category) -> OutputResult<()> {
        self.storage
            .upsert_category(self.run_id, category)
            .map_err(|e| OutputError::Storage(e.to_string()))
    }
}
