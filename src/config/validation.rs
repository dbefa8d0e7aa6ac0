use crate::config::types::{
    Config, ScraperConfig, DEFAULT_CONCURRENCY, DEFAULT_RATE_LIMIT, DEFAULT_USER_AGENT,
};
use crate::{ConfigError, ConfigResult};
use regex::Regex;
use url::Url;

/// Validates the entire configuration, coercing soft defaults in place
pub fn validate(config: &mut Config) -> ConfigResult<()> {
    if config.scrapers.is_empty() {
        return Err(ConfigError::Validation(
            "at least one scraper configuration is required".to_string(),
        ));
    }

    for (index, scraper) in config.scrapers.iter_mut().enumerate() {
        validate_scraper(index, scraper)?;
        coerce_defaults(scraper);
    }

    validate_output_config(&config.output)?;
    Ok(())
}

/// Replaces invalid rate, concurrency and user agent values by their defaults
///
/// These are soft errors: a scraper with `rate-limit = 0` is crawled at one
/// request per second rather than rejected.
pub fn coerce_defaults(scraper: &mut ScraperConfig) {
    if !scraper.rate_limit.is_finite() || scraper.rate_limit <= 0.0 {
        tracing::debug!(
            "Scraper '{}': rate limit {} coerced to {}",
            scraper.name,
            scraper.rate_limit,
            DEFAULT_RATE_LIMIT
        );
        scraper.rate_limit = DEFAULT_RATE_LIMIT;
    }

    for (domain, rate) in scraper.rate_limit_rules.iter_mut() {
        if !rate.is_finite() || *rate <= 0.0 {
            tracing::debug!("Rate rule for {} coerced to {}", domain, DEFAULT_RATE_LIMIT);
            *rate = DEFAULT_RATE_LIMIT;
        }
    }

    if scraper.concurrency <= 0 {
        scraper.concurrency = DEFAULT_CONCURRENCY;
    }

    if scraper.user_agent.trim().is_empty() {
        scraper.user_agent = DEFAULT_USER_AGENT.to_string();
    }
}

/// Validates the hard requirements of one scraper
fn validate_scraper(index: usize, scraper: &ScraperConfig) -> ConfigResult<()> {
    if scraper.name.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "scraper #{} is missing a name",
            index + 1
        )));
    }

    if scraper.url.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "scraper '{}' is missing a URL",
            scraper.name
        )));
    }

    validate_http_url(&scraper.url, "url")?;
    for seed in &scraper.seeds {
        validate_http_url(seed, "seed")?;
    }

    for proxy in &scraper.proxy_urls {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy URL '{}': {}", proxy, e)))?;
    }

    for pattern in scraper
        .allow_url_patterns
        .iter()
        .chain(scraper.deny_url_patterns.iter())
    {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("Invalid URL pattern '{}': {}", pattern, e))
        })?;
    }

    for domain in &scraper.allowed_domains {
        validate_domain_pattern(domain)?;
    }

    for path in &scraper.disallowed_paths {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "disallowed path '{}' in scraper '{}' must start with '/'",
                path, scraper.name
            )));
        }
    }

    Ok(())
}

/// Validates that a string is an absolute HTTP(S) URL
fn validate_http_url(raw: &str, what: &str) -> ConfigResult<()> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use the HTTP or HTTPS scheme",
            what, raw
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &crate::config::types::OutputConfig) -> ConfigResult<()> {
    if config.articles_dir.is_empty() {
        return Err(ConfigError::Validation(
            "articles_dir cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> ConfigResult<()> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(domain) => validate_domain_string(domain),
        None => validate_domain_string(pattern),
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> ConfigResult<()> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
