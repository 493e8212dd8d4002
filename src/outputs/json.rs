//! JSON report output.
//!
//! Reports are grouped by the local date of the run:
//! ```text
//! output_dir/
//! └── 2025-05-06/
//!     ├── section-105.json
//!     └── date-20250505.json
//! ```
//!
//! A second run for the same listing on the same day replaces the file.

use crate::models::KeywordReport;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Path of the JSON file for `report` under `output_dir`.
pub fn report_path(report: &KeywordReport, output_dir: &str) -> PathBuf {
    PathBuf::from(output_dir)
        .join(&report.local_date)
        .join(format!("{}.json", report.target_slug))
}

/// Write `report` as pretty-printed JSON and return the file path.
#[instrument(level = "info", skip_all, fields(%output_dir))]
pub async fn write_report(
    report: &KeywordReport,
    output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;
    let path = report_path(report, output_dir);

    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), items = report.items.len(), "Wrote JSON report");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewsItem;
    use crate::prompts::PromptTemplate;

    fn report() -> KeywordReport {
        KeywordReport::new(
            "section 105 (IT/Science)",
            "section-105",
            PromptTemplate::GenericKeywords,
            vec![NewsItem::new("Apple unveils headset", "https://example.com/1")],
        )
    }

    #[test]
    fn test_report_path_layout() {
        let report = report();
        let path = report_path(&report, "/tmp/out");
        assert_eq!(
            path,
            PathBuf::from(format!("/tmp/out/{}/section-105.json", report.local_date))
        );
    }

    #[tokio::test]
    async fn test_write_report_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("news_keywords_json_{}", std::process::id()));
        let dir = dir.to_str().unwrap().to_string();
        let report = report();

        let path = write_report(&report, &dir).await.unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).await.unwrap()).unwrap();

        assert_eq!(written["target_slug"], "section-105");
        assert_eq!(written["items"][0]["headline"], "Apple unveils headset");
        fs::remove_dir_all(&dir).await.unwrap();
    }
}
