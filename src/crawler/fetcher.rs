//! HTTP fetcher implementation
//!
//! This module handles the network side of a fetch:
//! - Building HTTP clients with proper user agent strings
//! - GET requests returning the raw body
//! - Error classification into the transient `FetchError` taxonomy
//!
//! Retrying, rate limiting and caching live in the scheduler.

use crate::config::UserAgentConfig;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// A successfully retrieved body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The URI the body was requested from
    pub uri: String,
    /// HTTP status code; 200 for cached bodies
    pub status: u16,
    /// Raw body bytes
    pub body: Vec<u8>,
    /// Whether the body came from the content cache
    pub from_cache: bool,
}

/// Performs a single network request
///
/// Implementations classify every failure as a `FetchError`; the caller
/// decides whether to try again.
#[async_trait(?Send)]
pub trait HttpFetcher {
    async fn fetch(&self, uri: &str) -> Result<Response, FetchError>;
}

/// Formats the user agent string
///
/// Format: CrawlerName/Version (+ContactURL; ContactEmail)
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use schap::config::UserAgentConfig;
/// use schap::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "schap".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "ops@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `HttpFetcher` backed by a `reqwest` client
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher with a client identifying as the configured crawler
    pub fn from_config(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?))
    }
}

/// Maps a `reqwest` error onto the transient error taxonomy
fn classify_error(uri: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            uri: uri.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Connection {
            uri: uri.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::Network {
            uri: uri.to_string(),
            message: error.to_string(),
        }
    }
}

#[async_trait(?Send)]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch(&self, uri: &str) -> Result<Response, FetchError> {
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|e| classify_error(uri, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                uri: uri.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_error(uri, e))?;

        Ok(Response {
            uri: uri.to_string(),
            status: status.as_u16(),
            body: body.to_vec(),
            from_cache: false,
        })
    }
}
