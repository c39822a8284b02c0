//! Scheduler for the fetch work queue
//!
//! This module handles:
//! - A FIFO queue of pending fetches, each with a completion callback
//! - Re-entrant scheduling: callbacks may enqueue further work
//! - One global rate limit shared by every network request
//! - Content caching keyed by the full request URI
//! - Retrying failed requests until they succeed or the policy gives up

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{HttpFetcher, Response};
use crate::crawler::limiter::{RateLimiter, RetryPolicy};
use crate::storage::ContentCache;
use crate::{FetchError, Result};
use std::collections::VecDeque;
use std::time::Duration;

/// Callback run with the response of a completed fetch
///
/// Receives the caller's context and the queue, so it can schedule more work.
pub type Completion<C> = Box<dyn FnOnce(&mut C, &mut WorkQueue<C>, Response) -> Result<()>>;

/// A URI waiting to be fetched
pub struct PendingFetch<C> {
    pub uri: String,
    on_complete: Completion<C>,
}

/// FIFO queue of pending fetches
pub struct WorkQueue<C> {
    items: VecDeque<PendingFetch<C>>,
}

impl<C> WorkQueue<C> {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Appends a fetch to the tail of the queue
    ///
    /// # Arguments
    ///
    /// * `uri` - The URI to fetch
    /// * `on_complete` - Run once with the response, after every item
    ///   scheduled before this one
    pub fn schedule<F>(&mut self, uri: impl Into<String>, on_complete: F)
    where
        F: FnOnce(&mut C, &mut WorkQueue<C>, Response) -> Result<()> + 'static,
    {
        self.items.push_back(PendingFetch {
            uri: uri.into(),
            on_complete: Box::new(on_complete),
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn pop(&mut self) -> Option<PendingFetch<C>> {
        self.items.pop_front()
    }
}

impl<C> Default for WorkQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Running fetch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchCounters {
    /// Bodies retrieved over the network
    pub pages_fetched: u64,
    /// Bodies served from the cache
    pub cache_hits: u64,
    /// Failed network attempts
    pub fetch_errors: u64,
    /// Pending fetches given up on
    pub abandoned_fetches: u64,
}

/// Turns queued URIs into rate-limited, cached, retried fetches
///
/// Everything runs on the calling task: a callback finishes before the
/// next item is dequeued.
pub struct Scheduler<C> {
    fetcher: Box<dyn HttpFetcher>,
    cache: Option<Box<dyn ContentCache>>,
    limiter: RateLimiter,
    retry: RetryPolicy,
    counters: FetchCounters,
    queue: WorkQueue<C>,
}

impl<C> Scheduler<C> {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Performs the network requests
    /// * `cache` - Content cache, when caching is enabled
    /// * `limiter` - The global rate limit
    /// * `retry` - Retry timing and give-up policy
    pub fn new(
        fetcher: Box<dyn HttpFetcher>,
        cache: Option<Box<dyn ContentCache>>,
        limiter: RateLimiter,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            cache,
            limiter,
            retry,
            counters: FetchCounters::default(),
            queue: WorkQueue::new(),
        }
    }

    /// Creates a scheduler with the rate limit and retry policy from config
    pub fn from_config(
        config: &CrawlerConfig,
        fetcher: Box<dyn HttpFetcher>,
        cache: Option<Box<dyn ContentCache>>,
    ) -> Self {
        Self::new(
            fetcher,
            cache,
            RateLimiter::new(Duration::from_millis(config.rate_limit_ms)),
            RetryPolicy::from_config(config),
        )
    }

    /// Appends a fetch to the queue
    pub fn schedule<F>(&mut self, uri: impl Into<String>, on_complete: F)
    where
        F: FnOnce(&mut C, &mut WorkQueue<C>, Response) -> Result<()> + 'static,
    {
        self.queue.schedule(uri, on_complete);
    }

    pub fn queue_mut(&mut self) -> &mut WorkQueue<C> {
        &mut self.queue
    }

    /// Number of fetches still queued
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn counters(&self) -> FetchCounters {
        self.counters
    }

    /// Fetches one URI
    ///
    /// A cached body is returned without touching the network or the rate
    /// limit. Otherwise every attempt waits for the rate limit, and failed
    /// attempts are retried after the policy's delay.
    ///
    /// # Returns
    ///
    /// * `Ok(Response)` - The body, from cache or network
    /// * `Err(FetchError::RetriesExhausted)` - The policy gave up
    pub async fn fetch(&mut self, uri: &str) -> std::result::Result<Response, FetchError> {
        if let Some(cache) = self.cache.as_ref() {
            match cache.get(uri) {
                Ok(Some(body)) => {
                    tracing::trace!("Cache hit: {}", uri);
                    self.counters.cache_hits += 1;
                    return Ok(Response {
                        uri: uri.to_string(),
                        status: 200,
                        body,
                        from_cache: true,
                    });
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Cache lookup failed for {}: {}", uri, e),
            }
        }

        let mut attempt: u32 = 0;
        loop {
            self.limiter.wait().await;
            attempt = attempt.saturating_add(1);
            tracing::debug!("Fetching {} (attempt {})", uri, attempt);

            match self.fetcher.fetch(uri).await {
                Ok(response) => {
                    self.counters.pages_fetched += 1;
                    if let Some(cache) = self.cache.as_mut() {
                        if let Err(e) = cache.put(uri, &response.body) {
                            tracing::warn!("Failed to cache {}: {}", uri, e);
                        }
                    }
                    return Ok(response);
                }
                Err(error) => {
                    self.counters.fetch_errors += 1;

                    if self.retry.exhausted(attempt) {
                        tracing::error!(
                            "Giving up on {} after {} attempts: {}",
                            uri,
                            attempt,
                            error
                        );
                        return Err(FetchError::RetriesExhausted {
                            uri: uri.to_string(),
                            attempts: attempt,
                        });
                    }

                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        "Attempt {} failed: {}; retrying in {:?}",
                        attempt,
                        error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Runs queued fetches until the queue is empty
    ///
    /// Callbacks run in scheduling order, and work they schedule joins the
    /// tail of the same queue. A fetch the retry policy gives up on is
    /// dropped without running its callback. A callback error stops the run.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Context handed to every callback
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - Number of callbacks run
    /// * `Err(SchapError)` - A callback failed
    pub async fn process_all(&mut self, ctx: &mut C) -> Result<u64> {
        let mut completed: u64 = 0;

        while let Some(PendingFetch { uri, on_complete }) = self.queue.pop() {
            match self.fetch(&uri).await {
                Ok(response) => {
                    on_complete(ctx, &mut self.queue, response)?;
                    completed += 1;

                    if completed % 25 == 0 {
                        tracing::info!(
                            "Progress: {} fetches completed, {} pending",
                            completed,
                            self.queue.len()
                        );
                    }
                }
                Err(FetchError::RetriesExhausted { attempts, .. }) => {
                    self.counters.abandoned_fetches += 1;
                    tracing::warn!("Abandoned {} after {} attempts", uri, attempts);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(completed)
    }
}
