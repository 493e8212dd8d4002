//! Markdown rendering of a [`KeywordReport`].
//!
//! The report opens with a summary table of every item, followed by one
//! section per item with its keywords and article text.

use crate::models::{KeywordReport, NewsItem};
use std::error::Error;
use std::fmt::Write;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

/// Escape characters that would break a table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Markdown table with one row per item: number, headline, keywords, URL.
pub fn items_table(items: &[NewsItem]) -> String {
    let mut table = String::new();
    writeln!(table, "| # | Headline | Keywords | URL |").unwrap();
    writeln!(table, "|---|----------|----------|-----|").unwrap();
    for (i, item) in items.iter().enumerate() {
        let keywords = item
            .keywords()
            .map(|k| k.terms.join(", "))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            table,
            "| {} | {} | {} | {} |",
            i + 1,
            cell(item.headline()),
            cell(&keywords),
            item.url()
        )
        .unwrap();
    }
    table
}

/// Render the whole report.
pub fn report_to_markdown(report: &KeywordReport) -> String {
    let mut md = String::new();
    writeln!(md, "# Keywords: {}\n", report.target).unwrap();
    writeln!(
        md,
        "_Prompt `{}`, generated {}_\n",
        report.prompt, report.generated_at
    )
    .unwrap();

    if report.items.is_empty() {
        writeln!(md, "No articles were processed.").unwrap();
        return md;
    }

    md.push_str(&items_table(&report.items));

    for (i, item) in report.items.iter().enumerate() {
        writeln!(md, "\n## {}. {}\n", i + 1, item.headline()).unwrap();
        writeln!(md, "<{}>\n", item.url()).unwrap();
        match item.keywords() {
            Some(keywords) => {
                writeln!(md, "### Keywords\n").unwrap();
                if keywords.groups.is_empty() {
                    for term in &keywords.terms {
                        writeln!(md, "- {term}").unwrap();
                    }
                }
                for group in &keywords.groups {
                    if group.label.is_empty() {
                        writeln!(md, "- {}", group.terms.join(", ")).unwrap();
                    } else {
                        writeln!(md, "- **{}**: {}", group.label, group.terms.join(", ")).unwrap();
                    }
                }
                md.push('\n');
            }
            None => writeln!(md, "_No keywords extracted._\n").unwrap(),
        }
        if let Some(content) = item.content() {
            writeln!(md, "### Article\n\n{content}").unwrap();
        }
    }
    md
}

/// Path of the Markdown file for `report` under `output_dir`.
pub fn report_path(report: &KeywordReport, output_dir: &str) -> PathBuf {
    PathBuf::from(output_dir).join(format!("{}_{}.md", report.local_date, report.target_slug))
}

/// Write the Markdown report and return the file path.
#[instrument(level = "info", skip_all, fields(%output_dir))]
pub async fn write_report(
    report: &KeywordReport,
    output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let path = report_path(report, output_dir);
    fs::write(&path, report_to_markdown(report)).await?;
    info!(path = %path.display(), "Wrote Markdown report");
    Ok(path)
}
