use serde::{Deserialize, Serialize};

/// A node in the retailer's product taxonomy
///
/// Categories discovered in navigation markup carry a crawl-relative id and
/// always report `has_children`, since that is only known once the category
/// page itself has been visited. Categories from a category index API carry
/// the retailer's own id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub has_children: bool,
    pub url: String,
}

impl Category {
    /// Creates an empty candidate with the given id, to be filled in while
    /// its markup is being read
    pub fn candidate(id: u64) -> Self {
        Self {
            id,
            name: String::new(),
            has_children: true,
            url: String::new(),
        }
    }
}
