//! Data models for listing entries, news items and the keyword report.
//!
//! - [`ListingEntry`]: one headline/link pair scraped from a listing page
//! - [`NewsItem`]: an entry as it moves through the pipeline, gaining its
//!   article text and then its keywords
//! - [`Keywords`]: raw model answer plus the split keyword terms
//! - [`KeywordReport`]: everything collected in one run, serialized to JSON

use crate::prompts::{AnswerFormat, PromptTemplate};
use chrono::{Local, Utc};
use clap::ValueEnum;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A headline and the article it links to, in listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub headline: String,
    pub url: String,
}

/// Violations of the item filling order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("cannot attach keywords to {url}: the item has no article content")]
    KeywordsWithoutContent { url: String },
}

/// A single news item.
///
/// Content is attached once the article page has been scraped, keywords only
/// once there is content to derive them from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsItem {
    headline: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keywords: Option<Keywords>,
}

impl NewsItem {
    pub fn new(headline: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            url: url.into(),
            content: None,
            keywords: None,
        }
    }

    pub fn headline(&self) -> &str {
        &self.headline
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn keywords(&self) -> Option<&Keywords> {
        self.keywords.as_ref()
    }

    pub fn set_content(&mut self, content: String) {
        self.content = Some(content);
    }

    pub fn set_keywords(&mut self, keywords: Keywords) -> Result<(), ItemError> {
        if self.content.is_none() {
            return Err(ItemError::KeywordsWithoutContent {
                url: self.url.clone(),
            });
        }
        self.keywords = Some(keywords);
        Ok(())
    }
}

impl From<ListingEntry> for NewsItem {
    fn from(entry: ListingEntry) -> Self {
        NewsItem::new(entry.headline, entry.url)
    }
}

/// What to do with keywords the model repeats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    /// Show every term as returned.
    Keep,
    /// Drop exact repeats, first occurrence wins.
    #[default]
    Exact,
    /// Drop repeats that differ only in letter case.
    IgnoreCase,
}

/// One labelled line of an answer, e.g. `기술: 혼합현실 헤드셋, 비전 프로`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordGroup {
    /// Empty for a line without a label.
    pub label: String,
    pub terms: Vec<String>,
}

/// The model's keyword answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keywords {
    /// Text exactly as the completion service returned it.
    pub raw: String,
    /// Trimmed, non-empty terms in answer order, labels removed.
    pub terms: Vec<String>,
    /// Terms per label, filled only for labelled-line answers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<KeywordGroup>,
}

impl Keywords {
    /// Split `raw` on `delimiter` and apply `policy`.
    ///
    /// ```ignore
    /// let kw = Keywords::parse("Vision Pro, Apple, Vision Pro".into(), ",", DedupPolicy::Exact);
    /// assert_eq!(kw.terms, vec!["Vision Pro", "Apple"]);
    /// ```
    pub fn parse(raw: String, delimiter: &str, policy: DedupPolicy) -> Self {
        let terms = split_terms(&raw, delimiter, policy);
        Keywords {
            raw,
            terms,
            groups: Vec::new(),
        }
    }

    /// Parse an answer written as `label: term, term` lines.
    ///
    /// Each line is split on `delimiter` after its label is removed. `policy`
    /// applies within a line and again across the flattened `terms`.
    pub fn parse_labelled(raw: String, delimiter: &str, policy: DedupPolicy) -> Self {
        let delimiter = effective_delimiter(delimiter);
        let groups: Vec<KeywordGroup> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| {
                let (label, rest) = split_label(line, delimiter);
                let terms = split_terms(rest, delimiter, policy);
                (!terms.is_empty()).then(|| KeywordGroup {
                    label: label.to_string(),
                    terms,
                })
            })
            .collect();
        let terms = dedup(
            groups.iter().flat_map(|g| g.terms.iter().cloned()),
            policy,
        );

        Keywords { raw, terms, groups }
    }

    /// Parse `raw` the way the prompt that produced it asked it to be written.
    pub fn parse_answer(
        raw: String,
        format: AnswerFormat,
        delimiter: &str,
        policy: DedupPolicy,
    ) -> Self {
        match format {
            AnswerFormat::Delimited => Self::parse(raw, delimiter, policy),
            AnswerFormat::LabelledLines => Self::parse_labelled(raw, delimiter, policy),
        }
    }

    /// Single-line rendering, e.g. `Vision Pro | Apple` or
    /// `기업: 애플; 기술: 혼합현실 헤드셋 | 비전 프로`.
    pub fn display(&self) -> String {
        if self.groups.is_empty() {
            return self.terms.join(" | ");
        }
        self.groups
            .iter()
            .map(|g| {
                let terms = g.terms.join(" | ");
                if g.label.is_empty() {
                    terms
                } else {
                    format!("{}: {terms}", g.label)
                }
            })
            .join("; ")
    }
}

fn effective_delimiter(delimiter: &str) -> &str {
    if delimiter.is_empty() { "," } else { delimiter }
}

/// Split on `delimiter`, collapse whitespace inside terms, drop empties, dedup.
fn split_terms(text: &str, delimiter: &str, policy: DedupPolicy) -> Vec<String> {
    let terms = text
        .split(effective_delimiter(delimiter))
        .map(|t| t.split_whitespace().join(" "))
        .filter(|t| !t.is_empty());
    dedup(terms, policy)
}

fn dedup(terms: impl Iterator<Item = String>, policy: DedupPolicy) -> Vec<String> {
    match policy {
        DedupPolicy::Keep => terms.collect(),
        DedupPolicy::Exact => terms.unique().collect(),
        DedupPolicy::IgnoreCase => terms.unique_by(|t| t.to_lowercase()).collect(),
    }
}

/// `("기업", " 애플")` for `기업: 애플`; no label when the text before the
/// first colon has spaces or delimiters in it, or the colon starts a URL.
fn split_label<'a>(line: &'a str, delimiter: &str) -> (&'a str, &'a str) {
    match line.split_once(':') {
        Some((label, rest))
            if !label.trim().is_empty()
                && !label.trim().contains(char::is_whitespace)
                && !label.contains(delimiter)
                && !rest.starts_with("//") =>
        {
            (label.trim(), rest)
        }
        _ => ("", line),
    }
}

/// Everything collected in one run.
#[derive(Debug, Serialize)]
pub struct KeywordReport {
    /// Human readable description of the listing that was read.
    pub target: String,
    /// File-name friendly form of `target`.
    pub target_slug: String,
    pub prompt: PromptTemplate,
    /// Local date of the run in `YYYY-MM-DD` format.
    pub local_date: String,
    /// RFC 3339 UTC timestamp of report creation.
    pub generated_at: String,
    pub items: Vec<NewsItem>,
}

impl KeywordReport {
    pub fn new(
        target: impl Into<String>,
        target_slug: impl Into<String>,
        prompt: PromptTemplate,
        items: Vec<NewsItem>,
    ) -> Self {
        Self {
            target: target.into(),
            target_slug: target_slug.into(),
            prompt,
            local_date: Local::now().date_naive().to_string(),
            generated_at: Utc::now().to_rfc3339(),
            items,
        }
    }
}
