//! Listing pages: which page to read and how to pull headlines out of it.
//!
//! # URL Pattern
//!
//! - Section front page: `{base}/main/main.nhn?mode=LSD&mid=shm&sid1={code}`
//! - Dated IT/Science list: `{base}/main/list.naver?mode=LSD&mid=sec&sid1=105&date={YYYYMMDD}`
//!
//! Links are resolved against the listing page URL, so relative hrefs come
//! back absolute.

use super::collapse_whitespace;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

use crate::models::ListingEntry;

/// Portal root used by the URL templates.
pub const DEFAULT_BASE_URL: &str = "https://news.naver.com";

static HEADLINE_BOX: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".sh_text").expect("valid headline box selector"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("valid anchor selector"));
static DATED_TITLE_ANCHOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".list_body.newsflash_body ul li dl dt:not(.photo) a")
        .expect("valid dated list selector")
});

/// News sections of the portal, keyed by their `sid1` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Politics,
    Economy,
    Society,
    LifeCulture,
    World,
    ItScience,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown news section `{0}` (expected a code from 100 to 105 or a section name)")]
pub struct ParseSectionError(String);

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Politics,
        Section::Economy,
        Section::Society,
        Section::LifeCulture,
        Section::World,
        Section::ItScience,
    ];

    pub fn code(self) -> u16 {
        match self {
            Section::Politics => 100,
            Section::Economy => 101,
            Section::Society => 102,
            Section::LifeCulture => 103,
            Section::World => 104,
            Section::ItScience => 105,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            Section::Politics => "Politics",
            Section::Economy => "Economy",
            Section::Society => "Society",
            Section::LifeCulture => "Life/Culture",
            Section::World => "World",
            Section::ItScience => "IT/Science",
        }
    }
}

impl FromStr for Section {
    type Err = ParseSectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u16>() {
            return Section::from_code(code).ok_or_else(|| ParseSectionError(s.to_string()));
        }
        match s.to_lowercase().as_str() {
            "politics" => Ok(Section::Politics),
            "economy" => Ok(Section::Economy),
            "society" => Ok(Section::Society),
            "life" | "culture" | "life-culture" | "life/culture" => Ok(Section::LifeCulture),
            "world" => Ok(Section::World),
            "it" | "science" | "it-science" | "it/science" => Ok(Section::ItScience),
            _ => Err(ParseSectionError(s.to_string())),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.label())
    }
}

/// Markup shape of a listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingLayout {
    /// `.sh_text` boxes, first anchor inside each.
    HeadlineBoxes,
    /// `dt` title cells of a dated list, thumbnail (`dt.photo`) cells skipped.
    DatedList,
}

/// Which listing page to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingStrategy {
    ByCategory(Section),
    /// IT/Science articles published on the given day.
    ByDate(NaiveDate),
}

impl ListingStrategy {
    pub fn listing_url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            ListingStrategy::ByCategory(section) => format!(
                "{base}/main/main.nhn?mode=LSD&mid=shm&sid1={}",
                section.code()
            ),
            ListingStrategy::ByDate(date) => format!(
                "{base}/main/list.naver?mode=LSD&mid=sec&sid1={}&date={}",
                Section::ItScience.code(),
                date.format("%Y%m%d")
            ),
        }
    }

    pub fn layout(&self) -> ListingLayout {
        match self {
            ListingStrategy::ByCategory(_) => ListingLayout::HeadlineBoxes,
            ListingStrategy::ByDate(_) => ListingLayout::DatedList,
        }
    }

    /// Short description for output headers.
    pub fn describe(&self) -> String {
        match self {
            ListingStrategy::ByCategory(section) => format!("section {section}"),
            ListingStrategy::ByDate(date) => format!("IT/Science headlines of {date}"),
        }
    }

    /// File-name friendly identifier.
    pub fn slug(&self) -> String {
        match self {
            ListingStrategy::ByCategory(section) => format!("section-{}", section.code()),
            ListingStrategy::ByDate(date) => format!("date-{}", date.format("%Y%m%d")),
        }
    }
}

/// Extract headline/link pairs from a listing page, in document order.
///
/// Entries without an `href`, with an unresolvable `href` or with an empty
/// headline are skipped. A page without matching elements yields an empty
/// vector.
#[instrument(level = "info", skip(document))]
pub fn extract_listing(document: &Html, page_url: &str, layout: ListingLayout) -> Vec<ListingEntry> {
    let base = Url::parse(page_url).ok();

    let anchors: Vec<ElementRef<'_>> = match layout {
        ListingLayout::HeadlineBoxes => document
            .select(&HEADLINE_BOX)
            .filter_map(|headline_box| headline_box.select(&ANCHOR).next())
            .collect(),
        ListingLayout::DatedList => document.select(&DATED_TITLE_ANCHOR).collect(),
    };

    let entries: Vec<ListingEntry> = anchors
        .into_iter()
        .filter_map(|anchor| entry_from_anchor(anchor, base.as_ref()))
        .collect();

    info!(count = entries.len(), "Extracted listing entries");
    debug!(entries = ?entries, "Listing entries");
    entries
}

fn entry_from_anchor(anchor: ElementRef<'_>, base: Option<&Url>) -> Option<ListingEntry> {
    let href = anchor.value().attr("href")?.trim();
    let url = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    let headline = collapse_whitespace(anchor.text());
    if headline.is_empty() {
        return None;
    }
    Some(ListingEntry {
        headline,
        url: url.to_string(),
    })
}
