//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Schap database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs and their summary counters
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    pages_fetched INTEGER NOT NULL DEFAULT 0,
    cache_hits INTEGER NOT NULL DEFAULT 0,
    fetch_errors INTEGER NOT NULL DEFAULT 0,
    abandoned_fetches INTEGER NOT NULL DEFAULT 0,
    categories_discovered INTEGER NOT NULL DEFAULT 0,
    products_emitted INTEGER NOT NULL DEFAULT 0,
    low_confidence_products INTEGER NOT NULL DEFAULT 0,
    malformed_articles INTEGER NOT NULL DEFAULT 0,
    documents_abandoned INTEGER NOT NULL DEFAULT 0
);

-- Categories discovered per run
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    category_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    url TEXT NOT NULL,
    has_children INTEGER NOT NULL,
    UNIQUE(run_id, category_id)
);

CREATE INDEX IF NOT EXISTS idx_categories_run ON categories(run_id);

-- Canonical products per run
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    identifier TEXT NOT NULL,
    name TEXT NOT NULL,
    tags TEXT NOT NULL,
    price INTEGER NOT NULL,
    orig_price INTEGER NOT NULL,
    discount_amount INTEGER NOT NULL CHECK (discount_amount >= 1),
    volume INTEGER NOT NULL CHECK (volume >= 1),
    volume_measure TEXT NOT NULL,
    valid_on TEXT NOT NULL,
    source_uri TEXT NOT NULL,
    image_uri TEXT,
    retrieved_on TEXT NOT NULL,
    confidence TEXT NOT NULL,
    problems TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_run ON products(run_id);
CREATE INDEX IF NOT EXISTS idx_products_identifier ON products(identifier);
CREATE INDEX IF NOT EXISTS idx_products_confidence ON products(confidence);

-- Fetched bodies keyed by request URI
CREATE TABLE IF NOT EXISTS page_cache (
    uri TEXT PRIMARY KEY,
    body BLOB NOT NULL,
    fetched_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
