//! Plain-text rendering of a run as it progresses.
//!
//! ```text
//! 1. Apple unveils headset
//!    URL: https://n.news.naver.com/article/001/1
//!    Keywords: Vision Pro | Apple
//! ```

use crate::models::NewsItem;
use crate::pipeline::ItemSink;
use std::io::{self, Write};

/// [`ItemSink`] that writes each item to `out` as soon as it is done.
#[derive(Debug)]
pub struct TerminalSink<W> {
    out: W,
    show_content: bool,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W, show_content: bool) -> Self {
        Self { out, show_content }
    }
}

impl<W: Write> ItemSink for TerminalSink<W> {
    fn listing_failed(&mut self, url: &str, status: u16) -> io::Result<()> {
        writeln!(
            self.out,
            "Error: the listing page answered with status {status} ({url})"
        )
    }

    fn listing_empty(&mut self, url: &str) -> io::Result<()> {
        writeln!(self.out, "No headlines found at {url}")
    }

    fn item(&mut self, index: usize, item: &NewsItem) -> io::Result<()> {
        writeln!(self.out, "{}. {}", index + 1, item.headline())?;
        writeln!(self.out, "   URL: {}", item.url())?;

        match (item.content(), item.keywords()) {
            (None, _) => writeln!(self.out, "   Article content not found; keywords skipped")?,
            (Some(_), None) => writeln!(self.out, "   Keywords: (none)")?,
            (Some(_), Some(keywords)) => writeln!(self.out, "   Keywords: {}", keywords.display())?,
        }

        if self.show_content {
            if let Some(content) = item.content() {
                writeln!(self.out, "   Content: {content}")?;
            }
        }
        writeln!(self.out)?;
        self.out.flush()
    }
}
