//! Content extraction
//!
//! Turns a fetched page into structured article content. The extractor is
//! a pure function of the page and the extraction configuration, so the same
//! page always yields the same content.

mod dom;

pub use dom::DomExtractor;

use crate::crawler::RawPage;
use std::collections::BTreeMap;
use thiserror::Error;

/// An image referenced by the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// The `src` attribute as found, unresolved
    pub url: String,
    pub alt: String,
}

/// Article content extracted from one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub url: String,
    pub title: String,
    /// Serialized main content
    pub body: String,
    /// Case-sensitive keys; later entries overwrite earlier ones
    pub metadata: BTreeMap<String, String>,
    /// Images in document order
    pub images: Vec<ImageRef>,
    pub word_count: usize,
}

/// Extraction failures; never retried
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("{url} is not HTML (content type '{content_type}')")]
    NotHtml { url: String, content_type: String },

    #[error("{url} could not be parsed: {reason}")]
    Unparseable { url: String, reason: String },
}

impl ExtractError {
    pub fn url(&self) -> &str {
        match self {
            Self::NotHtml { url, .. } | Self::Unparseable { url, .. } => url,
        }
    }
}

/// Converts a fetched page into article content
pub trait Extractor: Send + Sync {
    fn extract(&self, page: &RawPage) -> Result<ExtractedContent, ExtractError>;
}

/// Returns true for content types that may carry HTML markup
///
/// A missing content type counts as markup.
pub fn is_markup_content_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    media_type.is_empty()
        || media_type.starts_with("text/")
        || media_type.contains("html")
        || media_type.contains("xml")
}
