//! Article pages: body text of the content container.
//!
//! The body lives in the element with id `dic_area`. Scripts, links and
//! inline spans inside it are photo captions, reporter bylines and widgets,
//! so their text is left out.

use super::collapse_whitespace;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

/// CSS selector of the content container.
pub const CONTENT_CONTAINER: &str = "#dic_area";

/// Elements whose text never counts as article text.
const NOISE_TAGS: [&str; 3] = ["script", "a", "span"];

static CONTAINER: Lazy<Selector> =
    Lazy::new(|| Selector::parse(CONTENT_CONTAINER).expect("valid content container selector"));

/// Body text of an article page.
///
/// Returns `None` when the page has no content container, or when nothing but
/// noise is left inside it.
pub fn extract_article(document: &Html) -> Option<String> {
    document
        .select(&CONTAINER)
        .next()
        .map(container_text)
        .filter(|text| !text.is_empty())
}

/// Text of every container matching `selector`, joined with single spaces.
///
/// For pages that split the body across several containers.
pub fn extract_joined(document: &Html, selector: &Selector) -> Option<String> {
    let text = document
        .select(selector)
        .map(container_text)
        .filter(|text| !text.is_empty())
        .join(" ");
    (!text.is_empty()).then_some(text)
}

/// Visible text of `container`, noise elements excluded, whitespace collapsed.
pub fn container_text(container: ElementRef<'_>) -> String {
    let mut fragments = Vec::new();
    collect_visible(container, &mut fragments);
    collapse_whitespace(fragments)
}

fn collect_visible<'a>(element: ElementRef<'a>, out: &mut Vec<&'a str>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            if !NOISE_TAGS.contains(&child.value().name()) {
                collect_visible(child, out);
            }
        }
    }
}
