//! Scrape-Pipeline: a polite crawl-and-extract pipeline
//!
//! This crate fetches pages under per-domain rate, concurrency, retry, proxy and
//! robots.txt policy, and turns their HTML into structured article content ready
//! for downstream normalization, chunking and embedding.

pub mod config;
pub mod crawler;
pub mod extractor;
pub mod observe;
pub mod output;
pub mod pipeline;
pub mod policy;
pub mod robots;
pub mod url;

use thiserror::Error;

/// Main error type for Scrape-Pipeline operations
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Scrape-Pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, CrawlStreams, FetchError, FetchErrorKind, RawPage};
pub use extractor::{DomExtractor, ExtractedContent, Extractor, ImageRef};
pub use pipeline::{ExtractionOutcome, Normalizer, Pipeline, PipelineReport};
