//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the `Storage` and
//! `ContentCache` traits.

use crate::catalog::{CanonicalProduct, Category, Measure, ScrapedProduct};
use crate::normalize::Confidence;
use crate::output::CrawlStatistics;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ContentCache, Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::SchapError;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SchapError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SchapError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        // Initialize schema
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, SchapError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        stats: &CrawlStatistics,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2,
             pages_fetched = ?3, cache_hits = ?4, fetch_errors = ?5, abandoned_fetches = ?6,
             categories_discovered = ?7, products_emitted = ?8, low_confidence_products = ?9,
             malformed_articles = ?10, documents_abandoned = ?11
             WHERE id = ?12",
            params![
                status.to_db_string(),
                now,
                stats.pages_fetched as i64,
                stats.cache_hits as i64,
                stats.fetch_errors as i64,
                stats.abandoned_fetches as i64,
                stats.categories_discovered as i64,
                stats.products_emitted as i64,
                stats.low_confidence_products as i64,
                stats.malformed_articles as i64,
                stats.documents_abandoned as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }
}

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status,
    pages_fetched, cache_hits, fetch_errors, abandoned_fetches, categories_discovered,
    products_emitted, low_confidence_products, malformed_articles, documents_abandoned";

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let count = |idx: usize| row.get::<_, i64>(idx).map(|v| v as u64);
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Running),
        statistics: CrawlStatistics {
            pages_fetched: count(5)?,
            cache_hits: count(6)?,
            fetch_errors: count(7)?,
            abandoned_fetches: count(8)?,
            categories_discovered: count(9)?,
            products_emitted: count(10)?,
            low_confidence_products: count(11)?,
            malformed_articles: count(12)?,
            documents_abandoned: count(13)?,
        },
    })
}

/// Reads a JSON text column
fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Reads an RFC 3339 timestamp column
fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<ScrapedProduct> {
    let measure: String = row.get(7)?;
    let confidence: String = row.get(12)?;

    Ok(ScrapedProduct {
        product: CanonicalProduct {
            identifier: row.get(0)?,
            name: row.get(1)?,
            tags: json_column(row, 2)?,
            price: row.get(3)?,
            orig_price: row.get(4)?,
            discount_amount: row.get(5)?,
            volume: row.get::<_, i64>(6)? as u64,
            volume_measure: Measure::from_db_string(&measure).unwrap_or_default(),
            valid_on: time_column(row, 8)?,
        },
        source_uri: row.get(9)?,
        image_uri: row.get(10)?,
        retrieved_on: time_column(row, 11)?,
        confidence: Confidence::from_db_string(&confidence).unwrap_or(Confidence::Low),
        problems: json_column(row, 13)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS))?;

        let run = stmt
            .query_row(params![run_id], run_from_row)
            .map_err(|_| StorageError::RunNotFound(run_id))?;

        Ok(run)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        ))?;

        let run = stmt.query_row([], run_from_row).optional()?;

        Ok(run)
    }

    fn complete_run(&mut self, run_id: i64, statistics: &CrawlStatistics) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Completed, statistics)
    }

    fn fail_run(&mut self, run_id: i64, statistics: &CrawlStatistics) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Failed, statistics)
    }

    // ===== Catalog =====

    fn upsert_category(&mut self, run_id: i64, category: &Category) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO categories (run_id, category_id, name, url, has_children)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run_id,
                category.id as i64,
                category.name,
                category.url,
                category.has_children
            ],
        )?;
        Ok(())
    }

    fn insert_product(&mut self, run_id: i64, scraped: &ScrapedProduct) -> StorageResult<i64> {
        let product = &scraped.product;
        let tags = serde_json::to_string(&product.tags)?;
        let problems = serde_json::to_string(&scraped.problems)?;
        let volume = i64::try_from(product.volume).map_err(|_| {
            StorageError::Serialization(format!("volume {} does not fit a column", product.volume))
        })?;

        self.conn.execute(
            "INSERT INTO products (run_id, identifier, name, tags, price, orig_price,
             discount_amount, volume, volume_measure, valid_on, source_uri, image_uri,
             retrieved_on, confidence, problems)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                run_id,
                product.identifier,
                product.name,
                tags,
                product.price,
                product.orig_price,
                product.discount_amount,
                volume,
                product.volume_measure.to_db_string(),
                product.valid_on.to_rfc3339(),
                scraped.source_uri,
                scraped.image_uri,
                scraped.retrieved_on.to_rfc3339(),
                scraped.confidence.to_db_string(),
                problems
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_products(&self, run_id: i64) -> StorageResult<Vec<ScrapedProduct>> {
        let mut stmt = self.conn.prepare(
            "SELECT identifier, name, tags, price, orig_price, discount_amount, volume,
             volume_measure, valid_on, source_uri, image_uri, retrieved_on, confidence, problems
             FROM products WHERE run_id = ?1 ORDER BY id",
        )?;

        let products = stmt
            .query_map(params![run_id], product_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(products)
    }

    fn get_categories(&self, run_id: i64) -> StorageResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT category_id, name, has_children, url FROM categories
             WHERE run_id = ?1 ORDER BY id",
        )?;

        let categories = stmt
            .query_map(params![run_id], |row| {
                Ok(Category {
                    id: row.get::<_, i64>(0)? as u64,
                    name: row.get(1)?,
                    has_children: row.get(2)?,
                    url: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    // ===== Statistics =====

    fn count_products(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM products WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_products_by_confidence(
        &self,
        run_id: i64,
        confidence: Confidence,
    ) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM products WHERE run_id = ?1 AND confidence = ?2",
            params![run_id, confidence.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_categories(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn get_problem_summary(&self, run_id: i64) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT problems FROM products WHERE run_id = ?1 AND problems != '[]'",
        )?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        let rows = stmt.query_map(params![run_id], |row| {
            json_column::<Vec<crate::normalize::Problem>>(row, 0)
        })?;
        for problems in rows {
            for problem in problems? {
                *counts.entry(problem.field).or_insert(0) += 1;
            }
        }

        let mut summary: Vec<_> = counts.into_iter().collect();
        summary.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(summary)
    }
}

impl ContentCache for SqliteStorage {
    fn get(&self, uri: &str) -> StorageResult<Option<Vec<u8>>> {
        let body = self
            .conn
            .query_row(
                "SELECT body FROM page_cache WHERE uri = ?1",
                params![uri],
                |row| row.get(0),
            )
            .optional()?;
        Ok(body)
    }

    fn put(&mut self, uri: &str, body: &[u8]) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO page_cache (uri, body, fetched_at) VALUES (?1, ?2, ?3)",
            params![uri, body, now],
        )?;
        Ok(())
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM page_cache", [])?;
        Ok(())
    }
}
