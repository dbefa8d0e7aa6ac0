use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// User agent applied when a scraper does not name one
pub const DEFAULT_USER_AGENT: &str = "Scrape-Pipeline/1.0";

/// Requests per second applied when a scraper's rate is missing or invalid
pub const DEFAULT_RATE_LIMIT: f64 = 1.0;

/// Concurrency cap applied when a scraper's cap is missing or invalid
pub const DEFAULT_CONCURRENCY: i64 = 1;

/// Main configuration structure for Scrape-Pipeline
///
/// Keys are kebab-case; snake_case spellings are accepted as aliases. Unknown
/// top-level sections (such as `storage` or `embedding`) are ignored, while
/// unknown keys inside a known section are errors.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scrapers: Vec<ScraperConfig>,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl policy for one scraper (one site and its seeds)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScraperConfig {
    /// Human readable scraper name
    #[serde(default)]
    pub name: String,

    /// Base URL; always the first seed
    #[serde(default)]
    pub url: String,

    /// Additional seed URLs crawled alongside the base URL
    #[serde(default)]
    pub seeds: Vec<String>,

    #[serde(rename = "user-agent", alias = "user_agent", default)]
    pub user_agent: String,

    /// Default requests per second for every domain of this scraper
    #[serde(rename = "rate-limit", alias = "rate_limit", default)]
    pub rate_limit: f64,

    /// Per-hostname overrides of the requests per second
    #[serde(rename = "rate-limit-rules", alias = "rate_limit_rules", default)]
    pub rate_limit_rules: HashMap<String, f64>,

    /// Maximum in-flight requests per domain
    #[serde(default)]
    pub concurrency: i64,

    #[serde(rename = "respect-robots-txt", alias = "respect_robots_txt", default)]
    pub respect_robots_txt: bool,

    /// Whether robots.txt is downloaded to learn disallowed prefixes
    #[serde(rename = "fetch-robots-txt", alias = "fetch_robots_txt", default = "default_true")]
    pub fetch_robots_txt: bool,

    /// Path prefixes always treated as disallowed when robots are respected
    #[serde(rename = "disallowed-paths", alias = "disallowed_paths", default)]
    pub disallowed_paths: Vec<String>,

    /// Retries after the first attempt for retryable failures
    #[serde(rename = "retry-count", alias = "retry_count", default)]
    pub retry_count: u32,

    /// Fixed delay between retries (milliseconds)
    #[serde(rename = "retry-delay-ms", alias = "retry_delay_ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Wall-clock timeout of a single fetch (seconds)
    #[serde(rename = "timeout-secs", alias = "timeout_secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "proxy-urls", alias = "proxy_urls", default)]
    pub proxy_urls: Vec<String>,

    /// Regexes a URL must match (any of) to be crawled; empty means all
    #[serde(rename = "allow-url-patterns", alias = "allow_url_patterns", default)]
    pub allow_url_patterns: Vec<String>,

    /// Regexes that exclude a URL from crawling
    #[serde(rename = "deny-url-patterns", alias = "deny_url_patterns", default)]
    pub deny_url_patterns: Vec<String>,

    /// Domain patterns (e.g. "example.com" or "*.example.com"); empty means all
    #[serde(rename = "allowed-domains", alias = "allowed_domains", default)]
    pub allowed_domains: Vec<String>,

    /// Link-following depth; 0 crawls only the seeds
    #[serde(rename = "max-depth", alias = "max_depth", default)]
    pub max_depth: u32,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            url: String::new(),
            seeds: Vec::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            rate_limit: DEFAULT_RATE_LIMIT,
            rate_limit_rules: HashMap::new(),
            concurrency: DEFAULT_CONCURRENCY,
            respect_robots_txt: false,
            fetch_robots_txt: true,
            disallowed_paths: Vec::new(),
            retry_count: 0,
            retry_delay_ms: default_retry_delay_ms(),
            timeout_secs: default_timeout_secs(),
            proxy_urls: Vec::new(),
            allow_url_patterns: Vec::new(),
            deny_url_patterns: Vec::new(),
            allowed_domains: Vec::new(),
            max_depth: 0,
        }
    }
}

impl ScraperConfig {
    /// All seed URLs, base URL first
    pub fn seed_urls(&self) -> Vec<String> {
        std::iter::once(self.url.clone())
            .chain(self.seeds.iter().cloned())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Content extraction switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionConfig {
    #[serde(rename = "preserve-headings", alias = "preserve_headings", default = "default_true")]
    pub preserve_headings: bool,

    #[serde(rename = "extract-images", alias = "extract_images", default = "default_true")]
    pub extract_images: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            preserve_headings: true,
            extract_images: true,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory receiving one markdown file per extracted article
    #[serde(rename = "articles-dir", alias = "articles_dir", default = "default_articles_dir")]
    pub articles_dir: String,

    /// Path to the markdown run summary
    #[serde(rename = "summary-path", alias = "summary_path", default = "default_summary_path")]
    pub summary_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            articles_dir: default_articles_dir(),
            summary_path: default_summary_path(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_articles_dir() -> String {
    "./articles".to_string()
}

fn default_summary_path() -> String {
    "./summary.md".to_string()
}
