use serde::Deserialize;

/// Main configuration structure for Schap
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub retailer: RetailerConfig,
    pub output: OutputConfig,
}

/// Fetch scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Minimum time between two network requests, shared by all requests
    /// (milliseconds)
    #[serde(rename = "rate-limit-ms", default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Delay before the first retry of a failed request (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Factor applied to the retry delay after every failed attempt
    #[serde(rename = "retry-backoff", default = "default_retry_backoff")]
    pub retry_backoff: f64,

    /// Upper bound for the retry delay (milliseconds)
    #[serde(rename = "max-retry-delay-ms", default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,

    /// Attempts per request before giving up; absent means retry forever
    #[serde(rename = "max-attempts", default)]
    pub max_attempts: Option<u32>,

    /// Whether fetched bodies are cached and reused
    #[serde(default)]
    pub cache: bool,

    /// Path to the SQLite cache database
    #[serde(rename = "cache-path", default = "default_cache_path")]
    pub cache_path: String,

    /// What to do with a document that cannot be interpreted
    #[serde(rename = "on-document-error", default)]
    pub on_document_error: OnDocumentError,
}

fn default_rate_limit_ms() -> u64 {
    5000
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_retry_backoff() -> f64 {
    2.0
}

fn default_max_retry_delay_ms() -> u64 {
    60_000
}

fn default_cache_path() -> String {
    "./cache.db".to_string()
}

/// Policy for structurally malformed documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnDocumentError {
    /// Abort the whole crawl
    #[default]
    Fail,
    /// Log the document, count it and carry on
    SkipAndLog,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// How categories are discovered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NavigationMode {
    /// Category items in the root page's markup
    #[default]
    Markup,
    /// A JSON category index with per-category submenus
    MenuApi,
}

/// The retailer being crawled
#[derive(Debug, Clone, Deserialize)]
pub struct RetailerConfig {
    /// Short name, used in logs
    pub name: String,

    #[serde(default)]
    pub navigation: NavigationMode,

    /// Page or index the crawl starts from
    #[serde(rename = "root-url")]
    pub root_url: String,

    /// Submenu URL template for the menu API; `{id}` is replaced by the
    /// category id
    #[serde(rename = "submenu-url", default)]
    pub submenu_url: Option<String>,

    /// Product feed URL template; `{id}` is replaced by the category id
    #[serde(rename = "feed-url")]
    pub feed_url: String,

    /// Brand assigned to the retailer's own label
    #[serde(rename = "default-brand")]
    pub default_brand: String,
}

impl RetailerConfig {
    /// Product feed URL for a category id
    pub fn feed_url_for(&self, id: u64) -> String {
        self.feed_url.replace("{id}", &id.to_string())
    }

    /// Submenu URL for a category id, when the retailer has one
    pub fn submenu_url_for(&self, id: u64) -> Option<String> {
        self.submenu_url
            .as_ref()
            .map(|template| template.replace("{id}", &id.to_string()))
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}
