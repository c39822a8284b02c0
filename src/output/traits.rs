//! Output sink traits and error types
//!
//! This module defines the sinks the crawl hands its results to:
//! - `ProductSink`: one call per normalized feed article
//! - `CatalogSink`: a product sink that also records discovered categories

use crate::catalog::{Category, ScrapedProduct};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Receives every product found in a feed
///
/// An error returned from a sink aborts the crawl.
pub trait ProductSink {
    /// Records a scraped product
    ///
    /// # Arguments
    ///
    /// * `product` - The normalized product and its emission metadata
    fn on_product(&mut self, product: ScrapedProduct) -> OutputResult<()>;
}

/// A product sink that also keeps the category tree
pub trait CatalogSink: ProductSink {
    /// Records a discovered category
    ///
    /// # Arguments
    ///
    /// * `category` - The category, reported once per discovery
    fn record_category(&mut self, category: &Category) -> OutputResult<()>;
}
