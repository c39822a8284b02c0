//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives a crawl from the retailer's root to its products:
//! - Seeding the scheduler with the root page or category index
//! - Expanding categories breadth-first from markup or the menu API
//! - Scheduling one product feed per category
//! - Normalizing feed articles and handing them to the sink
//! - Applying the malformed-document policy

use crate::catalog::{Category, ScrapedProduct};
use crate::config::{Config, NavigationMode, OnDocumentError, RetailerConfig};
use crate::crawler::fetcher::{HttpFetcher, ReqwestFetcher, Response};
use crate::crawler::payload::{parse_feed, parse_menu, CHILDREN_MENU_KEY, ROOT_MENU_KEY};
use crate::crawler::scheduler::{Scheduler, WorkQueue};
use crate::navigation::{parse_navigation, NavigationMarkers};
use crate::normalize::{normalize_article, ArticleContext, Confidence};
use crate::output::{CatalogSink, CrawlStatistics};
use crate::storage::{ContentCache, SqliteStorage};
use crate::{Result, SchapError, StructuralError};
use chrono::Utc;
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Everything the fetch callbacks read and update
pub struct CrawlState<S> {
    sink: S,
    retailer: RetailerConfig,
    markers: NavigationMarkers,
    on_error: OnDocumentError,
    seen_uris: HashSet<String>,
    seen_category_ids: HashSet<u64>,
    next_category_id: u64,
    stats: CrawlStatistics,
}

impl<S: CatalogSink> CrawlState<S> {
    fn new(config: &Config, sink: S) -> Self {
        Self {
            sink,
            retailer: config.retailer.clone(),
            markers: NavigationMarkers::default(),
            on_error: config.crawler.on_document_error,
            seen_uris: HashSet::new(),
            seen_category_ids: HashSet::new(),
            next_category_id: 1,
            stats: CrawlStatistics::default(),
        }
    }

    fn record_category(&mut self, category: &Category) -> Result<()> {
        tracing::debug!("Category {} '{}' at {}", category.id, category.name, category.url);
        self.sink.record_category(category)?;
        self.stats.categories_discovered += 1;
        Ok(())
    }

    /// Applies the malformed-document policy
    fn document_failed(&mut self, uri: &str, error: StructuralError) -> Result<()> {
        match self.on_error {
            OnDocumentError::Fail => Err(SchapError::Document {
                uri: uri.to_string(),
                source: error,
            }),
            OnDocumentError::SkipAndLog => {
                tracing::warn!("Skipping malformed document {}: {}", uri, error);
                self.stats.documents_abandoned += 1;
                Ok(())
            }
        }
    }
}

/// Builds the network fetcher and, when enabled, the content cache
pub fn build_collaborators(
    config: &Config,
) -> Result<(Box<dyn HttpFetcher>, Option<Box<dyn ContentCache>>)> {
    let fetcher = ReqwestFetcher::from_config(&config.user_agent)?;

    let cache: Option<Box<dyn ContentCache>> = if config.crawler.cache {
        tracing::info!("Content cache enabled at {}", config.crawler.cache_path);
        Some(Box::new(SqliteStorage::new(Path::new(
            &config.crawler.cache_path,
        ))?))
    } else {
        None
    };

    Ok((Box::new(fetcher), cache))
}

/// Main crawler coordinator structure
pub struct Coordinator<S> {
    config: Config,
    scheduler: Scheduler<CrawlState<S>>,
    state: CrawlState<S>,
}

impl<S: CatalogSink + 'static> Coordinator<S> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `sink` - Receives categories and products
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(SchapError)` - The HTTP client or cache could not be set up
    pub fn new(config: Config, sink: S) -> Result<Self> {
        let (fetcher, cache) = build_collaborators(&config)?;
        Ok(Self::with_parts(config, fetcher, cache, sink))
    }

    /// Creates a coordinator from explicit collaborators
    pub fn with_parts(
        config: Config,
        fetcher: Box<dyn HttpFetcher>,
        cache: Option<Box<dyn ContentCache>>,
        sink: S,
    ) -> Self {
        let scheduler = Scheduler::from_config(&config.crawler, fetcher, cache);
        let state = CrawlState::new(&config, sink);

        Self {
            config,
            scheduler,
            state,
        }
    }

    /// Runs the crawl until every scheduled fetch has completed
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlStatistics)` - The crawl finished
    /// * `Err(SchapError)` - A sink failed, or a malformed document
    ///   aborted the crawl
    pub async fn run(&mut self) -> Result<CrawlStatistics> {
        let retailer = &self.config.retailer;
        let root = retailer.root_url.clone();
        tracing::info!("Starting crawl of {} at {}", retailer.name, root);

        match retailer.navigation {
            NavigationMode::Markup => {
                self.state.seen_uris.insert(root.clone());
                self.scheduler.schedule(root, |state, queue, response| {
                    handle_navigation_page(state, queue, response, None)
                });
            }
            NavigationMode::MenuApi => {
                self.scheduler.schedule(root, |state, queue, response| {
                    handle_menu(state, queue, response, ROOT_MENU_KEY)
                });
            }
        }

        let start_time = std::time::Instant::now();
        let completed = self.scheduler.process_all(&mut self.state).await?;
        let stats = self.statistics();

        tracing::info!(
            "Crawl completed: {} fetches in {:?}, {} categories, {} products ({} low confidence)",
            completed,
            start_time.elapsed(),
            stats.categories_discovered,
            stats.products_emitted,
            stats.low_confidence_products
        );

        Ok(stats)
    }

    /// Statistics gathered so far, including the scheduler's fetch counters
    pub fn statistics(&self) -> CrawlStatistics {
        let counters = self.scheduler.counters();
        CrawlStatistics {
            pages_fetched: counters.pages_fetched,
            cache_hits: counters.cache_hits,
            fetch_errors: counters.fetch_errors,
            abandoned_fetches: counters.abandoned_fetches,
            ..self.state.stats.clone()
        }
    }

    pub fn sink(&self) -> &S {
        &self.state.sink
    }

    pub fn into_sink(self) -> S {
        self.state.sink
    }

    /// Retrieves image bytes through the rate-limited, cached fetch path
    pub async fn download_image(&mut self, uri: &str) -> Result<Vec<u8>> {
        let response = self.scheduler.fetch(uri).await?;
        Ok(response.body)
    }
}

/// Handles a navigation page
///
/// Every category item not seen before is recorded and its page is
/// scheduled; every new catalog id gets a product feed fetch attributed to
/// `parent`, the category the page belongs to.
fn handle_navigation_page<S: CatalogSink + 'static>(
    state: &mut CrawlState<S>,
    queue: &mut WorkQueue<CrawlState<S>>,
    response: Response,
    parent: Option<Category>,
) -> Result<()> {
    let mut found = Vec::new();
    let mut catalog_ids = Vec::new();
    let parsed = parse_navigation(
        &response.body,
        &state.markers,
        state.next_category_id,
        |category: Category| found.push(category),
        |id: u64| catalog_ids.push(id),
    );
    match parsed {
        Ok(next_id) => state.next_category_id = next_id,
        Err(error) => return state.document_failed(&response.uri, error),
    }

    let base = Url::parse(&response.uri)?;
    for mut category in found {
        let resolved = match base.join(&category.url) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::debug!("Ignoring category link '{}': {}", category.url, e);
                continue;
            }
        };
        if !state.seen_uris.insert(resolved.clone()) {
            continue;
        }

        category.url = resolved;
        state.record_category(&category)?;

        let page = category.url.clone();
        queue.schedule(page, move |state, queue, response| {
            handle_navigation_page(state, queue, response, Some(category))
        });
    }

    for id in catalog_ids {
        if !state.seen_category_ids.insert(id) {
            continue;
        }
        let category = parent.clone();
        queue.schedule(state.retailer.feed_url_for(id), move |state, queue, response| {
            handle_feed(state, queue, response, category)
        });
    }

    Ok(())
}

/// Handles a category index or submenu response
fn handle_menu<S: CatalogSink + 'static>(
    state: &mut CrawlState<S>,
    queue: &mut WorkQueue<CrawlState<S>>,
    response: Response,
    key: &'static str,
) -> Result<()> {
    let retailer = &state.retailer;
    let categories = match parse_menu(&response.body, key, |id| retailer.feed_url_for(id)) {
        Ok(categories) => categories,
        Err(error) => return state.document_failed(&response.uri, error),
    };

    for category in categories {
        if !state.seen_category_ids.insert(category.id) {
            continue;
        }
        state.record_category(&category)?;

        if category.has_children {
            if let Some(submenu) = state.retailer.submenu_url_for(category.id) {
                queue.schedule(submenu, |state, queue, response| {
                    handle_menu(state, queue, response, CHILDREN_MENU_KEY)
                });
            }
        }

        let feed = category.url.clone();
        queue.schedule(feed, move |state, queue, response| {
            handle_feed(state, queue, response, Some(category))
        });
    }

    Ok(())
}

/// Handles a product feed
///
/// Articles lacking a required field are skipped and counted; every other
/// article reaches the sink, low confidence or not.
fn handle_feed<S: CatalogSink + 'static>(
    state: &mut CrawlState<S>,
    _queue: &mut WorkQueue<CrawlState<S>>,
    response: Response,
    category: Option<Category>,
) -> Result<()> {
    let articles = match parse_feed(&response.body) {
        Ok(articles) => articles,
        Err(error) => return state.document_failed(&response.uri, error),
    };
    tracing::debug!("Feed {} lists {} articles", response.uri, articles.len());

    let retrieved_on = Utc::now();
    let context = ArticleContext {
        default_brand: &state.retailer.default_brand,
        category: category.as_ref(),
        retrieved_on,
    };

    let mut products = Vec::with_capacity(articles.len());
    for (index, article) in articles.iter().enumerate() {
        match normalize_article(article, &context) {
            Ok(normalized) => products.push(normalized),
            Err(e) => {
                tracing::warn!("Skipping article {} in {}: {}", index, response.uri, e);
                state.stats.malformed_articles += 1;
            }
        }
    }

    for normalized in products {
        let (confidence, problems) = normalized.assessment.into_parts();
        if confidence == Confidence::Low {
            state.stats.low_confidence_products += 1;
            tracing::debug!(
                "Low confidence for {}: {}",
                normalized.product.identifier,
                problems
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            );
        }

        state.sink.on_product(ScrapedProduct {
            source_uri: response.uri.clone(),
            image_uri: normalized.image_uri,
            product: normalized.product,
            retrieved_on,
            confidence,
            problems,
        })?;
        state.stats.products_emitted += 1;
    }

    Ok(())
}
