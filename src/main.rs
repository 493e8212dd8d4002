//! # News Keywords
//!
//! Reads a news portal listing, scrapes each linked article and asks an
//! OpenAI-compatible LLM for the article's keywords.
//!
//! ## Usage
//!
//! ```sh
//! OPENAI_API_KEY=... news_keywords --category 105
//! OPENAI_API_KEY=... news_keywords --date 2024-05-01 --prompt company-tech -o ./reports
//! ```
//!
//! ## Architecture
//!
//! One linear pipeline, one article at a time:
//! 1. **Listing**: fetch the section or dated listing page once and pull out headlines
//! 2. **Fetching**: download each article page (3 attempts, 1 second apart)
//! 3. **Extraction**: take the body text from the article's content container
//! 4. **Keywords**: send the text to the model with the selected prompt
//! 5. **Output**: print each item as it finishes, then a summary table and
//!    optional JSON and Markdown reports

use clap::Parser;
use std::error::Error;
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::Path;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod fetch;
mod keywords;
mod models;
mod outputs;
mod pipeline;
mod prompts;
mod scrapers;
mod utils;

use api::OpenAiChat;
use cli::Cli;
use config::AppConfig;
use fetch::{HttpPageSource, RetryFetch};
use keywords::KeywordRequester;
use models::KeywordReport;
use outputs::{json, markdown, terminal::TerminalSink};
use pipeline::Pipeline;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_keywords starting up");

    let args = Cli::parse();
    debug!(?args.category, ?args.date, ?args.output_dir, "Parsed CLI arguments");

    let mut config = match &args.config {
        Some(path) => AppConfig::load(Path::new(path))?,
        None => AppConfig::default(),
    };
    config.apply_cli(&args);

    let strategy = args
        .strategy()
        .ok_or("either --category or --date is required")?;
    let api_key = config.api_key()?;

    // Early check: fail before spending tokens if the reports cannot be written
    if let Some(dir) = &args.output_dir {
        if let Err(e) = ensure_writable_dir(Path::new(dir)).await {
            error!(path = %dir, error = %e, "Output directory is not writable");
            return Err(e.into());
        }
    }

    let options = config.pipeline_options(args.limit.map(NonZeroUsize::get))?;
    let source = HttpPageSource::new(config.fetch.timeout(), &config.fetch.user_agent)?;
    let fetcher = RetryFetch::new(&source, config.fetch.retry_policy());
    let service = OpenAiChat::new(&config.completion.api_base, api_key, config.completion.timeout())?;
    info!(endpoint = service.endpoint(), "Completion service configured");
    let requester = KeywordRequester::new(service, config.completion.model.clone(), config.keywords.prompt);
    info!(
        listing = %strategy.describe(),
        prompt = %requester.template(),
        model = requester.model(),
        max_attempts = fetcher.policy().max_attempts,
        "Pipeline ready"
    );
    let pipeline = Pipeline::new(&source, fetcher, requester, options);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Keywords for {}\n", strategy.describe())?;

    let items = {
        let mut sink = TerminalSink::new(&mut out, args.show_content);
        pipeline.run(&strategy, &mut sink).await?
    };

    if !items.is_empty() {
        writeln!(out, "All items\n")?;
        write!(out, "{}", markdown::items_table(&items))?;
    }
    out.flush()?;

    let report = KeywordReport::new(
        strategy.describe(),
        strategy.slug(),
        config.keywords.prompt,
        items,
    );

    if let Some(dir) = &args.output_dir {
        if let Err(e) = json::write_report(&report, dir).await {
            error!(error = %e, "Failed to write JSON report");
        }
        if let Err(e) = markdown::write_report(&report, dir).await {
            error!(error = %e, "Failed to write Markdown report");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        items = report.items.len(),
        "Execution complete"
    );

    Ok(())
}
