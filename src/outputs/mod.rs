//! Output generation: terminal, JSON and Markdown.
//!
//! # Submodules
//!
//! - [`terminal`]: prints each item the moment the pipeline finishes it
//! - [`json`]: writes the [`KeywordReport`](crate::models::KeywordReport) for other tools
//! - [`markdown`]: summary table and per-item sections for reading
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 2025-05-06/
//! │   └── section-105.json
//! └── 2025-05-06_section-105.md
//! ```

pub mod json;
pub mod markdown;
pub mod terminal;
