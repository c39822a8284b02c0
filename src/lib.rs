//! Schap: a retailer catalog crawler
//!
//! This crate walks a retailer's category navigation, fetches the product
//! feed behind every category, and turns free-text supplier fields into
//! canonical product records tagged with a confidence signal.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod navigation;
pub mod normalize;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for Schap operations
#[derive(Debug, Error)]
pub enum SchapError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Malformed document at {uri}: {source}")]
    Document {
        uri: String,
        source: StructuralError,
    },

    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Transient network failures, retried by the scheduler
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {uri}")]
    Status { uri: String, status: u16 },

    #[error("Request timeout for {uri}")]
    Timeout { uri: String },

    #[error("Connection failed for {uri}: {message}")]
    Connection { uri: String, message: String },

    #[error("Network error for {uri}: {message}")]
    Network { uri: String, message: String },

    #[error("Gave up on {uri} after {attempts} attempts")]
    RetriesExhausted { uri: String, attempts: u32 },
}

impl FetchError {
    /// The URI the failed request was made for
    pub fn uri(&self) -> &str {
        match self {
            Self::Status { uri, .. }
            | Self::Timeout { uri }
            | Self::Connection { uri, .. }
            | Self::Network { uri, .. }
            | Self::RetriesExhausted { uri, .. } => uri,
        }
    }
}

/// Violations of the expected document structure
///
/// These are never retried: a body that arrived intact but cannot be
/// interpreted will not improve on a second download.
#[derive(Debug, Error)]
pub enum StructuralError {
    #[error("Closing </{found}> while <{expected}> is open")]
    MismatchedClose { expected: String, found: String },

    #[error("Closing </{tag}> without a matching open element")]
    UnexpectedClose { tag: String },

    #[error("{count} element(s) still open at end of document")]
    UnclosedElements { count: usize },

    #[error("Category id '{value}' is not an unsigned integer")]
    InvalidCategoryId { value: String },

    #[error("Invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Missing field '{0}'")]
    MissingField(String),

    #[error("Field '{field}' has unusable value '{value}'")]
    InvalidField { field: String, value: String },
}

/// Result type alias for Schap operations
pub type Result<T> = std::result::Result<T, SchapError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for document interpretation
pub type StructuralResult<T> = std::result::Result<T, StructuralError>;

// Re-export commonly used types
pub use catalog::{CanonicalProduct, Category, Measure, ScrapedProduct, Tag, TagKind};
pub use config::Config;
pub use normalize::{Assessment, Confidence, Interpreted, Problem};
