//! URL handling module for Scrape-Pipeline
//!
//! This module provides target parsing, de-duplication keys, domain
//! extraction, wildcard domain matching, and the allow/deny URL filter.

mod domain;
mod matcher;
mod normalize;

pub use domain::{extract_domain, robots_txt_url};
pub use matcher::{matches_wildcard, UrlFilter};
pub use normalize::{dedupe_key, parse_target};
