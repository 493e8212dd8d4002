//! Utility functions for log formatting and output directories.

use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

const WRITE_CHECK_FILE: &str = ".news_keywords_write_check";

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes, on a character boundary, with
/// an ellipsis and the number of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Create `dir` if needed and check that report files can be written into it.
///
/// Writes and removes a marker file, so an unwritable directory is reported
/// before any article is fetched.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn ensure_writable_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir).await?;
    let marker = dir.join(WRITE_CHECK_FILE);
    fs::write(&marker, b"").await?;
    if let Err(e) = fs::remove_file(&marker).await {
        warn!(path = %marker.display(), error = %e, "Could not remove write-check file");
    }
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.ends_with("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // Each Hangul syllable is three bytes in UTF-8.
        let s = "애플 비전 프로";
        let result = truncate_for_log(s, 4);
        assert_eq!(result, format!("애…(+{} bytes)", s.len() - 3));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_directory() {
        let dir = std::env::temp_dir()
            .join(format!("news_keywords_out_{}", std::process::id()))
            .join("reports");

        ensure_writable_dir(&dir).await.unwrap();

        assert!(dir.is_dir());
        assert!(!dir.join(WRITE_CHECK_FILE).exists());
        fs::remove_dir_all(dir.parent().unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_under_a_file_fails() {
        let file = std::env::temp_dir().join(format!("news_keywords_file_{}", std::process::id()));
        fs::write(&file, b"not a directory").await.unwrap();

        assert!(ensure_writable_dir(&file.join("reports")).await.is_err());
        fs::remove_file(&file).await.unwrap();
    }
}
