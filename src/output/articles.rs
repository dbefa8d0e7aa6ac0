//! Markdown article sink
//!
//! The binary's downstream normalizer: each extracted article becomes one
//! markdown file with YAML front matter. Failures are only logged.

use crate::extractor::ExtractedContent;
use crate::output::{OutputError, OutputResult};
use crate::pipeline::{ExtractionOutcome, Normalizer};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// Longest readable part of a file stem produced by [`article_slug`]
const MAX_SLUG_LEN: usize = 120;

/// Hex digits of the URL digest appended to every slug
const SLUG_DIGEST_LEN: usize = 8;

#[derive(Serialize)]
struct FrontMatter<'a> {
    title: &'a str,
    url: &'a str,
    word_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a BTreeMap<String, String>>,
}

/// Writes extracted articles as markdown files into a directory
#[derive(Debug)]
pub struct MarkdownNormalizer {
    articles_dir: PathBuf,
    written: AtomicUsize,
}

impl MarkdownNormalizer {
    /// Creates the sink, creating `articles_dir` if needed
    pub fn new(articles_dir: impl Into<PathBuf>) -> OutputResult<Self> {
        let articles_dir = articles_dir.into();
        fs::create_dir_all(&articles_dir)?;
        Ok(Self {
            articles_dir,
            written: AtomicUsize::new(0),
        })
    }

    /// Number of distinct article files written so far
    pub fn written(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }

    pub fn articles_dir(&self) -> &Path {
        &self.articles_dir
    }

    /// Writes one article and returns its path
    pub fn write_article(&self, content: &ExtractedContent) -> OutputResult<PathBuf> {
        let path = self
            .articles_dir
            .join(format!("{}.md", article_slug(&content.url)));
        let existed = path.exists();
        fs::write(&path, format_article(content)?)?;
        if existed {
            tracing::debug!("Overwrote {}", path.display());
        } else {
            self.written.fetch_add(1, Ordering::Relaxed);
        }
        Ok(path)
    }
}

impl Normalizer for MarkdownNormalizer {
    fn accept(&self, outcome: ExtractionOutcome) {
        match outcome {
            ExtractionOutcome::Extracted(content) => match self.write_article(&content) {
                Ok(path) => tracing::debug!("Wrote {} to {}", content.url, path.display()),
                Err(e) => tracing::error!("Failed to write article for {}: {}", content.url, e),
            },
            ExtractionOutcome::ExtractionFailed { url, error } => {
                tracing::debug!("No article for {}: {}", url, error);
            }
            ExtractionOutcome::FetchFailed(error) => {
                tracing::debug!("No article for {}: {}", error.url, error.kind);
            }
        }
    }
}

/// Renders an article as markdown with YAML front matter
pub fn format_article(content: &ExtractedContent) -> OutputResult<String> {
    let front_matter = FrontMatter {
        title: &content.title,
        url: &content.url,
        word_count: content.word_count,
        metadata: (!content.metadata.is_empty()).then_some(&content.metadata),
    };
    let yaml = serde_yaml::to_string(&front_matter)
        .map_err(|e| OutputError::Format(e.to_string()))?;

    let mut md = String::new();
    md.push_str("---\n");
    md.push_str(&yaml);
    md.push_str("---\n\n");

    if !content.title.trim().is_empty() {
        md.push_str(&format!("# {}\n\n", content.title.trim()));
    }

    md.push_str(content.body.trim());
    md.push('\n');

    if !content.images.is_empty() {
        md.push_str("\n## Images\n\n");
        for image in &content.images {
            md.push_str(&format!("- ![{}]({})\n", image.alt, image.url));
        }
    }

    Ok(md)
}

/// File stem for an article URL: host and path with every run of
/// non-alphanumeric characters collapsed to one dash, followed by a short
/// SHA-256 digest of the full URL
///
/// # Examples
///
/// ```
/// use scrape_pipeline::output::article_slug;
///
/// let slug = article_slug("https://Example.com/blog/Hello_World/");
/// assert!(slug.starts_with("example-com-blog-hello-world-"));
/// assert_ne!(slug, article_slug("https://example.com/blog/hello-world"));
/// ```
pub fn article_slug(url: &str) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    format!("{}-{}", readable_slug(url), &digest[..SLUG_DIGEST_LEN])
}

fn readable_slug(url: &str) -> String {
    let source = match Url::parse(url) {
        Ok(parsed) => {
            let mut s = parsed.host_str().unwrap_or_default().to_string();
            s.push_str(parsed.path());
            if let Some(query) = parsed.query() {
                s.push('-');
                s.push_str(query);
            }
            s
        }
        Err(_) => url.to_string(),
    };

    let mut slug = String::with_capacity(source.len());
    for c in source.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let slug = slug.trim_matches('-');
    let slug: String = slug.chars().take(MAX_SLUG_LEN).collect();
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        "index".to_string()
    } else {
        slug.to_string()
    }
}
