//! Streaming navigation parser
//!
//! This module recognizes the retailer's category navigation without
//! building a document tree:
//! - `tokenizer`: turns raw markup into a stream of `MarkupEvent`s
//! - `machine`: a state machine that consumes those events and reports
//!   categories and catalog ids through sink callbacks
//!
//! # Example
//!
//! ```
//! use schap::navigation::{parse_navigation, NavigationMarkers};
//! use schap::Category;
//!
//! let html = br#"<ul><li class="categoryItem"><a href="/kaas"><span class="title">Kaas</span></a></li></ul>"#;
//! let mut categories = Vec::new();
//! let mut ids = Vec::new();
//! parse_navigation(html, &NavigationMarkers::default(), 1, |c: Category| categories.push(c), |id: u64| ids.push(id)).unwrap();
//! assert_eq!(categories[0].name, "Kaas");
//! ```

mod events;
mod machine;
mod tokenizer;

pub use events::{Element, MarkupEvent};
pub use machine::{CategoryIdSink, CategorySink, NavigationMachine, NavigationMarkers};
pub use tokenizer::tokenize;

use crate::StructuralResult;

/// Runs the navigation machine over a whole document
///
/// # Arguments
///
/// * `body` - Raw markup bytes, decoded as UTF-8 (lossily)
/// * `markers` - The ids and classes that identify navigation structures
/// * `first_id` - The id assigned to the first category found
/// * `on_category` - Called once per category, in document order
/// * `on_category_id` - Called once per catalog id field
///
/// # Returns
///
/// * `Ok(u64)` - The id the next category would receive
/// * `Err(StructuralError)` - The markup is not well nested
pub fn parse_navigation<C, I>(
    body: &[u8],
    markers: &NavigationMarkers,
    first_id: u64,
    on_category: C,
    on_category_id: I,
) -> StructuralResult<u64>
where
    C: CategorySink,
    I: CategoryIdSink,
{
    let mut machine =
        NavigationMachine::new(markers.clone(), first_id, on_category, on_category_id);
    tokenize(body, &mut machine)?;
    machine.finish()?;
    Ok(machine.next_id())
}
