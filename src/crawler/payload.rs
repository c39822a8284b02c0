//! JSON payloads served by the retailer
//!
//! - product feeds: `{"articles": [...]}`
//! - category index and submenus: `{"<key>": [{"id", "name", "hasChildren"}]}`

use crate::catalog::Category;
use crate::{StructuralError, StructuralResult};
use serde::Deserialize;
use serde_json::Value;

/// Key of the top-level category list in the index response
pub const ROOT_MENU_KEY: &str = "rootWebshopCategories";

/// Key of the child category list in a submenu response
pub const CHILDREN_MENU_KEY: &str = "childrenWebshopCategories";

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    articles: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MenuEntry {
    id: u64,
    name: String,
    #[serde(default)]
    has_children: bool,
}

/// Splits a product feed into its articles
///
/// A feed without an `articles` key is empty. Articles are returned
/// untouched; each one is validated when it is normalized.
pub fn parse_feed(body: &[u8]) -> StructuralResult<Vec<Value>> {
    let feed: Feed = serde_json::from_slice(body)?;
    Ok(feed.articles)
}

/// Reads the category list stored under `key`
///
/// # Arguments
///
/// * `body` - The JSON response body
/// * `key` - `ROOT_MENU_KEY` or `CHILDREN_MENU_KEY`
/// * `url_for` - Builds the URL recorded for each category from its id
///
/// # Returns
///
/// * `Ok(Vec<Category>)` - The categories, in payload order
/// * `Err(StructuralError)` - The body is not JSON, lacks the key, or an
///   entry lacks an id or name
pub fn parse_menu<F>(body: &[u8], key: &str, url_for: F) -> StructuralResult<Vec<Category>>
where
    F: Fn(u64) -> String,
{
    let mut payload: Value = serde_json::from_slice(body)?;
    let entries = payload
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| StructuralError::MissingField(key.to_string()))?;
    let entries: Vec<MenuEntry> = serde_json::from_value(entries)?;

    Ok(entries
        .into_iter()
        .map(|entry| Category {
            url: url_for(entry.id),
            id: entry.id,
            name: entry.name.trim().to_string(),
            has_children: entry.has_children,
        })
        .collect())
}
