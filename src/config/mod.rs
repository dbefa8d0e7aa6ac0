//! Configuration module for Scrape-Pipeline
//!
//! This module handles loading, parsing, and validating TOML or YAML
//! configuration files.
//!
//! # Example
//!
//! ```no_run
//! use scrape_pipeline::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.yaml")).unwrap();
//! for scraper in &config.scrapers {
//!     println!("{} at {} req/s", scraper.name, scraper.rate_limit);
//! }
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ExtractionConfig, OutputConfig, ScraperConfig, DEFAULT_CONCURRENCY,
    DEFAULT_RATE_LIMIT, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, default_config, load_config, load_config_with_hash, parse_config,
    write_default_config, ConfigFormat,
};
pub use validation::coerce_defaults;
