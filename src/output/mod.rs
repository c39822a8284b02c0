//! Output module for crawl results and summaries
//!
//! This module handles:
//! - The sinks that receive categories and products during a crawl
//! - Persisting those records to the SQLite run tables
//! - Recording and displaying crawl statistics

mod memory;
mod sqlite_output;
pub mod stats;
mod traits;

pub use memory::MemorySink;
pub use sqlite_output::SqliteCatalogSink;
pub use stats::{load_statistics, print_run_summary, print_statistics, CrawlStatistics, RunSummary};
pub use traits::{CatalogSink, OutputError, OutputResult, ProductSink};
