//! Crawler module for web page fetching
//!
//! This module contains the streaming crawl engine, including:
//! - HTTP fetching with retry and proxy rotation
//! - Per-domain concurrency slots and rate limiting
//! - Robots.txt exclusion
//! - Depth-limited link following

mod engine;
mod fetcher;
mod parser;
mod types;

pub use engine::{CrawlEngine, CrawlStreams};
pub use fetcher::{build_http_client, fetch_page, ClientPool, FetchOutcome};
pub use parser::extract_links;
pub use types::{CrawlTarget, FetchError, FetchErrorKind, RawPage};
