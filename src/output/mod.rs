//! Output module for articles and run summaries
//!
//! This module handles:
//! - Writing extracted articles as markdown files
//! - Generating the markdown summary of a run
//! - Printing run statistics

mod articles;
mod markdown;
pub mod stats;

pub use articles::{article_slug, format_article, MarkdownNormalizer};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::print_statistics;

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
