use crate::config::ScraperConfig;
use crate::{ConfigError, ConfigResult};
use regex::Regex;

/// Checks if a domain matches a wildcard pattern
///
/// "example.com" matches only itself; "*.example.com" matches the bare domain
/// and any subdomain at any depth.
///
/// # Examples
///
/// ```
/// use scrape_pipeline::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "notexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .map_or(false, |prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}

/// Pre-dispatch URL filter built from a scraper's allow/deny configuration
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    allow: Vec<Regex>,
    deny: Vec<Regex>,
    allowed_domains: Vec<String>,
}

impl UrlFilter {
    /// Compiles the scraper's URL patterns
    pub fn from_config(config: &ScraperConfig) -> ConfigResult<Self> {
        Ok(Self {
            allow: compile_all(&config.allow_url_patterns)?,
            deny: compile_all(&config.deny_url_patterns)?,
            allowed_domains: config
                .allowed_domains
                .iter()
                .map(|d| d.to_lowercase())
                .collect(),
        })
    }

    /// Returns true if the URL passes the allow patterns and no deny pattern
    ///
    /// An empty allow list admits every URL.
    pub fn admits(&self, url: &str) -> bool {
        let allowed = self.allow.is_empty() || self.allow.iter().any(|re| re.is_match(url));
        allowed && !self.deny.iter().any(|re| re.is_match(url))
    }

    /// Returns true if the domain is covered by the allowed domain patterns
    ///
    /// An empty domain list admits every domain.
    pub fn domain_allowed(&self, domain: &str) -> bool {
        self.allowed_domains.is_empty()
            || self
                .allowed_domains
                .iter()
                .any(|pattern| matches_wildcard(pattern, domain))
    }
}

fn compile_all(patterns: &[String]) -> ConfigResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p)
                .map_err(|e| ConfigError::InvalidPattern(format!("Invalid URL pattern '{}': {}", p, e)))
        })
        .collect()
}
