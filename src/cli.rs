//! Command-line interface definitions.
//!
//! The listing to read is chosen with exactly one of `--category` or
//! `--date`. Everything else is optional and overrides the config file.

use crate::models::DedupPolicy;
use crate::prompts::PromptTemplate;
use crate::scrapers::listing::{ListingStrategy, Section};
use chrono::NaiveDate;
use clap::{ArgGroup, Parser};
use std::num::NonZeroUsize;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Keywords for the IT/Science front page
/// news_keywords --category 105
///
/// # Company and technology names from one day's IT/Science list, saved to disk
/// news_keywords --date 2024-05-01 --prompt company-tech -o ./reports
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(group(ArgGroup::new("listing").required(true).args(["category", "date"])))]
pub struct Cli {
    /// News section to read: 100 (politics), 101 (economy), 102 (society),
    /// 103 (life/culture), 104 (world), 105 (IT/science), or the section name
    #[arg(short, long)]
    pub category: Option<Section>,

    /// Read the IT/Science list published on this day (YYYY-MM-DD)
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Keyword question asked about each article
    #[arg(short, long, value_enum)]
    pub prompt: Option<PromptTemplate>,

    /// Chat model identifier
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_API_BASE")]
    pub api_base: Option<String>,

    /// API key for the completion service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Delimiter the model's keyword answer is split on
    #[arg(long)]
    pub delimiter: Option<String>,

    /// How repeated keywords are treated
    #[arg(long, value_enum)]
    pub dedup: Option<DedupPolicy>,

    /// CSS selector whose matches together form the article body
    /// (default: the single `#dic_area` container)
    #[arg(long)]
    pub content_selector: Option<String>,

    /// Process at most this many headlines (at least 1)
    #[arg(short, long)]
    pub limit: Option<NonZeroUsize>,

    /// Directory for the JSON and Markdown reports
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Optional path to a config.yaml file
    #[arg(long)]
    pub config: Option<String>,

    /// Print the full article text under each item
    #[arg(long)]
    pub show_content: bool,
}

impl Cli {
    /// The listing selected on the command line.
    pub fn strategy(&self) -> Option<ListingStrategy> {
        match (self.category, self.date) {
            (Some(section), _) => Some(ListingStrategy::ByCategory(section)),
            (None, Some(date)) => Some(ListingStrategy::ByDate(date)),
            (None, None) => None,
        }
    }
}
