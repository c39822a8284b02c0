//! Category navigation state machine
//!
//! The machine consumes markup events in document order and never looks
//! back. It has three states:
//! - `Init`: looking for a blocked region, a category item or an id field
//! - `Category`: inside a category item, collecting its link and title
//! - `Blocked`: inside a region whose contents must be ignored
//!
//! Leaving a state is tied to the element that entered it. Each entry pushes
//! an exit action together with the depth of its element; the action fires
//! when the close event brings the document back to that depth, so markup
//! nested inside the element cannot end the state early. Pending exits fire
//! in reverse order of entry.

use crate::catalog::Category;
use crate::navigation::events::{Element, MarkupEvent};
use crate::{StructuralError, StructuralResult};

/// Receives categories as they are completed
pub trait CategorySink {
    fn on_category(&mut self, category: Category);
}

/// Receives catalog ids found in category-name fields
pub trait CategoryIdSink {
    fn on_category_id(&mut self, id: u64);
}

impl<F: FnMut(Category)> CategorySink for F {
    fn on_category(&mut self, category: Category) {
        self(category)
    }
}

impl<F: FnMut(u64)> CategoryIdSink for F {
    fn on_category_id(&mut self, id: u64) {
        self(id)
    }
}

/// The ids, classes and field names that identify navigation structures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationMarkers {
    /// Element id of the site-wide menu, whose contents are ignored
    pub blocked_id: String,
    /// Class of the list items that describe a category
    pub category_class: String,
    /// Class of the element holding a category's display name
    pub title_class: String,
    /// Name of the input field carrying the catalog id
    pub category_id_field: String,
}

impl Default for NavigationMarkers {
    fn default() -> Self {
        Self {
            blocked_id: "header-mainnav".to_string(),
            category_class: "categoryItem".to_string(),
            title_class: "title".to_string(),
            category_id_field: "CategoryName".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Category,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitAction {
    LeaveBlocked,
    EmitCategory,
    EndTitleCapture,
}

#[derive(Debug)]
struct PendingExit {
    depth: usize,
    action: ExitAction,
}

/// Streaming recognizer for category navigation markup
pub struct NavigationMachine<C, I> {
    markers: NavigationMarkers,
    state: State,
    open: Vec<String>,
    exits: Vec<PendingExit>,
    candidate: Option<Category>,
    capture: Option<String>,
    next_id: u64,
    on_category: C,
    on_category_id: I,
}

impl<C: CategorySink, I: CategoryIdSink> NavigationMachine<C, I> {
    /// Creates a machine in the initial state
    ///
    /// # Arguments
    ///
    /// * `markers` - The navigation markers to recognize
    /// * `first_id` - Id assigned to the first category found; later ones
    ///   count up from it
    /// * `on_category` - Receives each completed category
    /// * `on_category_id` - Receives each catalog id
    pub fn new(markers: NavigationMarkers, first_id: u64, on_category: C, on_category_id: I) -> Self {
        Self {
            markers,
            state: State::Init,
            open: Vec::new(),
            exits: Vec::new(),
            candidate: None,
            capture: None,
            next_id: first_id,
            on_category,
            on_category_id,
        }
    }

    /// The id the next category will receive
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Number of elements currently open
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn handle(&mut self, event: MarkupEvent) -> StructuralResult<()> {
        match event {
            MarkupEvent::Open(element) => self.open(element),
            MarkupEvent::Text(text) => {
                self.text(&text);
                Ok(())
            }
            MarkupEvent::Close(name) => self.close(&name),
        }
    }

    pub fn open(&mut self, element: Element) -> StructuralResult<()> {
        self.open.push(element.name.clone());
        let depth = self.open.len();

        match self.state {
            State::Init => self.open_in_init(&element, depth),
            State::Category => {
                self.open_in_category(&element, depth);
                Ok(())
            }
            State::Blocked => Ok(()),
        }
    }

    fn open_in_init(&mut self, element: &Element, depth: usize) -> StructuralResult<()> {
        if element.attribute("id") == Some(self.markers.blocked_id.as_str()) {
            tracing::trace!("Entering blocked region at depth {}", depth);
            self.state = State::Blocked;
            self.exits.push(PendingExit {
                depth,
                action: ExitAction::LeaveBlocked,
            });
        } else if element.name == "li" && element.has_class(&self.markers.category_class) {
            self.state = State::Category;
            self.candidate = Some(Category::candidate(self.next_id));
            self.next_id += 1;
            self.exits.push(PendingExit {
                depth,
                action: ExitAction::EmitCategory,
            });
        } else if element.name == "input"
            && element.attribute("name") == Some(self.markers.category_id_field.as_str())
        {
            let value = element.attribute("value").unwrap_or("").trim();
            let id = value
                .parse::<u64>()
                .map_err(|_| StructuralError::InvalidCategoryId {
                    value: value.to_string(),
                })?;
            self.on_category_id.on_category_id(id);
        }
        Ok(())
    }

    fn open_in_category(&mut self, element: &Element, depth: usize) {
        if element.name == "a" {
            if let (Some(candidate), Some(href)) = (self.candidate.as_mut(), element.attribute("href")) {
                candidate.url = href.trim().to_string();
            }
        } else if self.capture.is_none() && element.has_class(&self.markers.title_class) {
            self.capture = Some(String::new());
            self.exits.push(PendingExit {
                depth,
                action: ExitAction::EndTitleCapture,
            });
        }
    }

    pub fn text(&mut self, text: &str) {
        if let Some(capture) = self.capture.as_mut() {
            capture.push_str(text);
        }
    }

    pub fn close(&mut self, name: &str) -> StructuralResult<()> {
        let depth = self.open.len();
        let Some(expected) = self.open.last() else {
            return Err(StructuralError::UnexpectedClose {
                tag: name.to_string(),
            });
        };
        if expected != name {
            return Err(StructuralError::MismatchedClose {
                expected: expected.clone(),
                found: name.to_string(),
            });
        }
        self.open.pop();

        while self.exits.last().is_some_and(|exit| exit.depth == depth) {
            if let Some(exit) = self.exits.pop() {
                self.fire(exit.action);
            }
        }
        Ok(())
    }

    fn fire(&mut self, action: ExitAction) {
        match action {
            ExitAction::LeaveBlocked => {
                tracing::trace!("Leaving blocked region");
                self.state = State::Init;
            }
            ExitAction::EmitCategory => {
                if let Some(category) = self.candidate.take() {
                    tracing::debug!("Found category '{}' at {}", category.name, category.url);
                    self.on_category.on_category(category);
                }
                self.state = State::Init;
            }
            ExitAction::EndTitleCapture => {
                if let (Some(captured), Some(candidate)) = (self.capture.take(), self.candidate.as_mut()) {
                    candidate.name = sanitize(&captured);
                }
            }
        }
    }

    /// Checks that the document ended with every element closed
    pub fn finish(&self) -> StructuralResult<()> {
        if self.open.is_empty() {
            Ok(())
        } else {
            Err(StructuralError::UnclosedElements {
                count: self.open.len(),
            })
        }
    }
}

/// Trims and collapses runs of whitespace into single spaces
fn sanitize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(name: &str) -> MarkupEvent {
        MarkupEvent::Open(Element::new(name))
    }

    fn open_with(name: &str, attribute: &str, value: &str) -> MarkupEvent {
        MarkupEvent::Open(Element::new(name).with_attribute(attribute, value))
    }

    fn text(text: &str) -> MarkupEvent {
        MarkupEvent::Text(text.to_string())
    }

    fn close(name: &str) -> MarkupEvent {
        MarkupEvent::Close(name.to_string())
    }

    fn category_item(href: &str, title: &str) -> Vec<MarkupEvent> {
        vec![
            open_with("li", "class", "categoryItem"),
            MarkupEvent::Open(Element::new("a").with_attribute("href", href)),
            open_with("span", "class", "title"),
            text(title),
            close("span"),
            close("a"),
            close("li"),
        ]
    }

    fn run(events: Vec<MarkupEvent>) -> StructuralResult<(Vec<Category>, Vec<u64>)> {
        let mut categories = Vec::new();
        let mut ids = Vec::new();
        {
            let mut machine = NavigationMachine::new(
                NavigationMarkers::default(),
                1,
                |c: Category| categories.push(c),
                |id: u64| ids.push(id),
            );
            for event in events {
                machine.handle(event)?;
            }
            machine.finish()?;
        }
        Ok((categories, ids))
    }

    #[test]
    fn test_emits_categories_in_document_order() {
        let mut events = vec![open("ul")];
        events.extend(category_item("/brood", "Brood"));
        events.extend(category_item("/kaas", "Kaas"));
        events.push(close("ul"));

        let (categories, _) = run(events).unwrap();

        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].name, "Brood");
        assert_eq!(categories[0].url, "/brood");
        assert_eq!(categories[0].id, 1);
        assert_eq!(categories[1].name, "Kaas");
        assert_eq!(categories[1].id, 2);
    }

    #[test]
    fn test_title_whitespace_is_sanitized() {
        let events = vec![
            open_with("li", "class", "categoryItem"),
            open_with("div", "class", "title big"),
            text("\n   Aardappelen,\n"),
            open("em"),
            text("  groente "),
            close("em"),
            text(" en fruit  "),
            close("div"),
            close("li"),
        ];

        let (categories, _) = run(events).unwrap();
        assert_eq!(categories[0].name, "Aardappelen, groente en fruit");
    }

    #[test]
    fn test_blocked_region_is_ignored_at_any_depth() {
        let mut events = vec![open("body"), open_with("nav", "id", "header-mainnav")];
        for _ in 0..20 {
            events.push(open("div"));
        }
        events.extend(category_item("/menu", "Menu"));
        events.push(open_with("input", "name", "CategoryName"));
        events.push(close("input"));
        for _ in 0..20 {
            events.push(close("div"));
        }
        events.push(close("nav"));
        events.extend(category_item("/zuivel", "Zuivel"));
        events.push(close("body"));

        let (categories, ids) = run(events).unwrap();

        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Zuivel");
        assert!(ids.is_empty());
    }

    #[test]
    fn test_deep_nesting_does_not_end_category_early() {
        let mut events = vec![open_with("li", "class", "categoryItem")];
        for _ in 0..10 {
            events.push(open("div"));
        }
        events.push(MarkupEvent::Open(Element::new("a").with_attribute("href", "/diep")));
        events.push(close("a"));
        for _ in 0..10 {
            events.push(close("div"));
        }
        events.push(open_with("p", "class", "title"));
        events.push(text("Diep"));
        events.push(close("p"));
        events.push(close("li"));

        let (categories, _) = run(events).unwrap();

        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].url, "/diep");
        assert_eq!(categories[0].name, "Diep");
    }

    #[test]
    fn test_category_id_field() {
        let events = vec![
            open("form"),
            MarkupEvent::Open(
                Element::new("input")
                    .with_attribute("type", "hidden")
                    .with_attribute("name", "CategoryName")
                    .with_attribute("value", " 1234 "),
            ),
            close("input"),
            close("form"),
        ];

        let (categories, ids) = run(events).unwrap();
        assert!(categories.is_empty());
        assert_eq!(ids, vec![1234]);
    }

    #[test]
    fn test_invalid_category_id_is_fatal() {
        let events = vec![MarkupEvent::Open(
            Element::new("input")
                .with_attribute("name", "CategoryName")
                .with_attribute("value", "abc"),
        )];

        assert!(matches!(
            run(events),
            Err(StructuralError::InvalidCategoryId { value }) if value == "abc"
        ));
    }

    #[test]
    fn test_mismatched_close_fails() {
        let events = vec![open("ul"), open("li"), close("ul")];
        assert!(matches!(
            run(events),
            Err(StructuralError::MismatchedClose { expected, found }) if expected == "li" && found == "ul"
        ));
    }

    #[test]
    fn test_close_without_open_fails() {
        assert!(matches!(
            run(vec![close("div")]),
            Err(StructuralError::UnexpectedClose { .. })
        ));
    }

    #[test]
    fn test_unclosed_elements_fail() {
        assert!(matches!(
            run(vec![open("html"), open("body")]),
            Err(StructuralError::UnclosedElements { count: 2 })
        ));
    }

    #[test]
    fn test_category_without_link_is_still_emitted() {
        let events = vec![
            open_with("li", "class", "categoryItem"),
            open_with("span", "class", "title"),
            text("Acties"),
            close("span"),
            close("li"),
        ];

        let (categories, _) = run(events).unwrap();
        assert_eq!(categories[0].name, "Acties");
        assert!(categories[0].url.is_empty());
    }

    #[test]
    fn test_plain_list_items_are_not_categories() {
        let events = vec![
            open_with("li", "class", "categoryItemWide"),
            text("Geen"),
            close("li"),
        ];
        let (categories, _) = run(events).unwrap();
        assert!(categories.is_empty());
    }

    #[test]
    fn test_next_id_counts_candidates() {
        let mut machine =
            NavigationMachine::new(NavigationMarkers::default(), 10, |_c: Category| {}, |_id: u64| {});
        for event in category_item("/a", "A") {
            machine.handle(event).unwrap();
        }
        assert_eq!(machine.next_id(), 11);
        assert_eq!(machine.depth(), 0);
    }
}
