//! HTML extraction for the news portal.
//!
//! Reading the portal is a two-phase affair, like any other source:
//!
//! 1. **Listing**: pull headline/link pairs out of a listing page
//! 2. **Article**: pull the body text out of each linked article page
//!
//! | Strategy | Listing page | Layout |
//! |----------|--------------|--------|
//! | [`ListingStrategy::ByCategory`](listing::ListingStrategy::ByCategory) | section front page | `.sh_text` headline boxes |
//! | [`ListingStrategy::ByDate`](listing::ListingStrategy::ByDate) | IT/Science list for one day | `dt` titles, photo entries excluded |
//!
//! Both extractors are pure functions over a parsed [`scraper::Html`]
//! document; the documents are never modified.

use itertools::Itertools;

pub mod article;
pub mod listing;

/// Join text fragments with single spaces, dropping all other whitespace.
pub(crate) fn collapse_whitespace<'a>(fragments: impl IntoIterator<Item = &'a str>) -> String {
    fragments
        .into_iter()
        .flat_map(str::split_whitespace)
        .join(" ")
}
