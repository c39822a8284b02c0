//! Catalog data model
//!
//! This module defines the records that flow out of a crawl:
//! - `Category`: a node of the retailer's product taxonomy
//! - `CanonicalProduct`: a product with typed, normalized quantities
//! - `ScrapedProduct`: a canonical product plus its provenance and confidence

mod category;
mod product;

pub use category::Category;
pub use product::{CanonicalProduct, Measure, ScrapedProduct, Tag, TagKind};
