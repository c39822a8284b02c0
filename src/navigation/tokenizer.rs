//! Markup tokenizer adapter
//!
//! Feeds raw bytes through the `html5ever` tokenizer and forwards the tokens
//! the navigation machine cares about. No tree is built: start tags become
//! `open` events, end tags `close` events and character data `text` events.
//! Void and self-closing elements are closed immediately after opening.

use crate::navigation::events::Element;
use crate::navigation::machine::{CategoryIdSink, CategorySink, NavigationMachine};
use crate::{StructuralError, StructuralResult};
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

/// Elements that never have content or a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

struct EventSink<'m, C, I> {
    machine: &'m mut NavigationMachine<C, I>,
    error: Option<StructuralError>,
}

impl<C: CategorySink, I: CategoryIdSink> EventSink<'_, C, I> {
    fn forward_tag(&mut self, tag: Tag) -> StructuralResult<()> {
        let name = tag.name.to_string();
        match tag.kind {
            TagKind::StartTag => {
                let mut element = Element::new(name.clone());
                for attribute in tag.attrs {
                    element = element
                        .with_attribute(attribute.name.local.to_string(), attribute.value.to_string());
                }
                self.machine.open(element)?;
                if tag.self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
                    self.machine.close(&name)?;
                }
                Ok(())
            }
            // End tags of void elements were already closed at their start tag
            TagKind::EndTag if VOID_ELEMENTS.contains(&name.as_str()) => Ok(()),
            TagKind::EndTag => self.machine.close(&name),
        }
    }
}

/// Tells the tokenizer to treat element content as text where a browser would
fn raw_content(tag: &Tag) -> Option<RawKind> {
    if tag.kind != TagKind::StartTag || tag.self_closing {
        return None;
    }
    match &*tag.name {
        "script" => Some(RawKind::ScriptData),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawKind::Rawtext),
        "textarea" | "title" => Some(RawKind::Rcdata),
        _ => None,
    }
}

impl<C: CategorySink, I: CategoryIdSink> TokenSink for EventSink<'_, C, I> {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        if self.error.is_some() {
            return TokenSinkResult::Continue;
        }

        let (outcome, next) = match token {
            Token::TagToken(tag) => {
                let raw = raw_content(&tag);
                (self.forward_tag(tag), raw)
            }
            Token::CharacterTokens(text) => {
                self.machine.text(&text);
                (Ok(()), None)
            }
            _ => (Ok(()), None),
        };

        if let Err(error) = outcome {
            self.error = Some(error);
            return TokenSinkResult::Continue;
        }

        match next {
            Some(kind) => TokenSinkResult::RawData(kind),
            None => TokenSinkResult::Continue,
        }
    }
}

/// Tokenizes `body` and feeds every event to `machine`
///
/// Stops forwarding at the first structural error and returns it. Does not
/// check for elements left open; call `NavigationMachine::finish` for that.
pub fn tokenize<C, I>(body: &[u8], machine: &mut NavigationMachine<C, I>) -> StructuralResult<()>
where
    C: CategorySink,
    I: CategoryIdSink,
{
    let text = String::from_utf8_lossy(body);

    let sink = EventSink {
        machine,
        error: None,
    };
    let mut tokenizer = Tokenizer::new(sink, TokenizerOpts::default());

    let mut input = BufferQueue::new();
    input.push_back(StrTendril::from_slice(&text));
    let _ = tokenizer.feed(&mut input);
    tokenizer.end();

    match tokenizer.sink.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;
    use crate::navigation::NavigationMarkers;

    fn parse(html: &str) -> StructuralResult<(Vec<Category>, Vec<u64>)> {
        let mut categories = Vec::new();
        let mut ids = Vec::new();
        {
            let mut machine = NavigationMachine::new(
                NavigationMarkers::default(),
                1,
                |c: Category| categories.push(c),
                |id: u64| ids.push(id),
            );
            tokenize(html.as_bytes(), &mut machine)?;
            machine.finish()?;
        }
        Ok((categories, ids))
    }

    #[test]
    fn test_full_page() {
        let html = r#"<!DOCTYPE html>
<html>
<head><title>Boodschappen</title><meta charset="utf-8"></head>
<body>
  <nav id="header-mainnav">
    <ul><li class="categoryItem"><a href="/overal">Overal</a></li></ul>
  </nav>
  <!-- categories -->
  <ul class="categories">
    <li class="categoryItem"><a href="/zuivel"><span class="title">Zuivel &amp; eieren</span></a></li>
    <li class="categoryItem"><a href="/brood"><span class="title">Brood</span></a></li>
  </ul>
  <form><input type="hidden" name="CategoryName" value="77"></form>
  <img src="/logo.png"/>
  <br>
</body>
</html>"#;

        let (categories, ids) = parse(html).unwrap();

        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].name, "Zuivel & eieren");
        assert_eq!(categories[0].url, "/zuivel");
        assert_eq!(categories[1].name, "Brood");
        assert_eq!(ids, vec![77]);
    }

    #[test]
    fn test_script_content_is_not_markup() {
        let html = r#"<div><script>if (a < b && c) { document.write("<li class='categoryItem'>"); }</script></div>"#;
        let (categories, _) = parse(html).unwrap();
        assert!(categories.is_empty());
    }

    #[test]
    fn test_explicit_void_end_tag_is_ignored() {
        let (_, ids) = parse(r#"<p><input name="CategoryName" value="5"></input></p>"#).unwrap();
        assert_eq!(ids, vec![5]);
    }

    #[test]
    fn test_mismatched_markup_fails() {
        let result = parse("<ul><li class=\"categoryItem\"><a href=\"/x\">X</li></ul>");
        assert!(matches!(
            result,
            Err(StructuralError::MismatchedClose { .. })
        ));
    }

    #[test]
    fn test_unclosed_markup_fails() {
        assert!(matches!(
            parse("<div><span>open"),
            Err(StructuralError::UnclosedElements { count: 2 })
        ));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut body = b"<li class=\"categoryItem\"><span class=\"title\">Caf".to_vec();
        body.push(0xe9);
        body.extend_from_slice(b"</span></li>");

        let mut categories = Vec::new();
        let mut machine = NavigationMachine::new(
            NavigationMarkers::default(),
            1,
            |c: Category| categories.push(c),
            |_id: u64| {},
        );
        tokenize(&body, &mut machine).unwrap();
        machine.finish().unwrap();
        drop(machine);

        assert_eq!(categories[0].name, "Caf\u{fffd}");
    }
}
