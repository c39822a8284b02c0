use crate::catalog::{Category, ScrapedProduct};
use crate::output::traits::{CatalogSink, OutputResult, ProductSink};

/// Collects crawl output in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub categories: Vec<Category>,
    pub products: Vec<ScrapedProduct>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProductSink for MemorySink {
    fn on_product(&mut self, product: ScrapedProduct) -> OutputResult<()> {
        self.products.push(product);
        Ok(())
    }
}

impl CatalogSink for MemorySink {
    fn record_category(&mut self, category: &Category) -> OutputResult<()> {
        self.categories.push(category.clone());
        Ok(())
    }
}
