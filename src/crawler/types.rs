//! Records produced by the crawl engine

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

/// A URL queued for fetching
///
/// Domain policy (rate, concurrency cap, patterns, robots flag) is inherited
/// from the scraper that owns the engine and does not change during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub url: Url,
    /// Link distance from the seed list (seeds are 0)
    pub depth: u32,
}

impl CrawlTarget {
    pub fn seed(url: Url) -> Self {
        Self { url, depth: 0 }
    }

    pub fn child(url: Url, parent_depth: u32) -> Self {
        Self {
            url,
            depth: parent_depth + 1,
        }
    }
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct RawPage {
    /// The requested URL
    pub url: String,
    pub body: String,
    pub status: u16,
    /// Content-Type header value, empty if absent
    pub content_type: String,
    /// Response headers with lowercase names
    pub headers: HashMap<String, String>,
    pub fetched_at: DateTime<Utc>,
}

/// Why a target produced no page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchErrorKind {
    #[error("disallowed by robots.txt")]
    RobotsDisallowed,

    #[error("domain {domain} is not in the allowed domains")]
    DomainNotAllowed { domain: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),
}

impl FetchErrorKind {
    /// Rejections decided locally, before any request to the target
    pub fn is_policy_rejection(&self) -> bool {
        matches!(
            self,
            Self::RobotsDisallowed | Self::DomainNotAllowed { .. } | Self::InvalidUrl(_)
        )
    }

    /// Short stable label used in metrics and reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::RobotsDisallowed => "robots_disallowed",
            Self::DomainNotAllowed { .. } => "domain_not_allowed",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Transport(_) => "transport",
            Self::HttpStatus(_) => "http_status",
        }
    }
}

/// Terminal failure for one target
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to fetch {url} after {attempts} attempt(s): {kind}")]
pub struct FetchError {
    pub url: String,
    pub kind: FetchErrorKind,
    /// Requests actually sent for this target
    pub attempts: u32,
}

impl FetchError {
    pub fn new(url: impl Into<String>, kind: FetchErrorKind, attempts: u32) -> Self {
        Self {
            url: url.into(),
            kind,
            attempts,
        }
    }

    /// A rejection made before any request was sent
    pub fn rejected(url: impl Into<String>, kind: FetchErrorKind) -> Self {
        Self::new(url, kind, 0)
    }
}
